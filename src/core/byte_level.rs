//! Bijective byte ↔ printable-character mapping for byte-level BPE.
//!
//! GPT-2 style BPE operates over "word"-like strings of printable characters,
//! but the tokenizer must represent every possible UTF-8 byte sequence,
//! including control characters and whitespace. This module maps each of the
//! 256 byte values to a distinct printable Unicode scalar so that a chunk of
//! raw bytes becomes an ordinary string the merge loop can work on, and maps
//! it back during decoding.
//!
//! # Mapping
//!
//! Bytes that are already printable keep their own character value:
//!
//! - `!` (33) to `~` (126)
//! - `¡` (161) to `¬` (172)
//! - `®` (174) to `ÿ` (255)
//!
//! Every other byte is assigned, in ascending byte order, a consecutive
//! codepoint starting at U+0100. The mapping is a pure function of the byte
//! value, so the same vocabulary keys come out for the same input on every
//! run. Space (32) maps to `Ġ` (U+0120), which is why GPT-2 vocabularies are
//! full of `Ġ`-prefixed entries.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Whether a byte is in one of the self-representing printable ranges.
#[inline]
fn is_visible(b: u8) -> bool {
    matches!(b, 33..=126 | 161..=172 | 174..=255)
}

/// Byte value → mapped character, for all 256 byte values.
static BYTE_TO_CHAR: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut table = ['\0'; 256];
    let mut next_synthetic = 0x100u32;
    for b in 0u8..=255 {
        table[b as usize] = if is_visible(b) {
            b as char
        } else {
            let ch = char::from_u32(next_synthetic).expect("below surrogate range");
            next_synthetic += 1;
            ch
        };
    }
    table
});

/// Mapped character → byte value (inverse of [`BYTE_TO_CHAR`]).
static CHAR_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_CHAR
        .iter()
        .enumerate()
        .map(|(b, &ch)| (ch, b as u8))
        .collect()
});

/// Map raw bytes into the printable working string used by the merge loop.
#[inline]
pub fn map_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| BYTE_TO_CHAR[b as usize]).collect()
}

/// Map a working string back to raw bytes.
///
/// Characters outside the mapping are skipped rather than reported; decode is
/// expected to survive partially-invalid vocabulary entries.
#[inline]
pub fn unmap_chars(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|ch| CHAR_TO_BYTE.get(&ch).copied())
        .collect()
}

/// The mapped character for one byte value.
#[inline]
pub fn char_for_byte(byte: u8) -> char {
    BYTE_TO_CHAR[byte as usize]
}

/// The byte value for one mapped character, if it is in the alphabet.
#[inline]
pub fn byte_for_char(ch: char) -> Option<u8> {
    CHAR_TO_BYTE.get(&ch).copied()
}
