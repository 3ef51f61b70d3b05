//! Core tokenization engine for bytepair.
//!
//! This module contains the byte-level BPE tokenizer implementation:
//! - Byte-pair encoding driven by a ranked merge table
//! - Vocabulary loading from HuggingFace `vocab.json` + `tokenizer_config.json`
//! - Merge-rule loading from `merges.txt`
//! - Main tokenizer interface with LRU caching and special token handling
//!
//! # Architecture
//!
//! The core is organized into six components:
//!
//! - [`Tokenizer`]: Main tokenizer struct with encoding/decoding API, LRU cache,
//!   and Aho-Corasick special token matching
//! - [`bpe`]: Low-level greedy byte-pair merge loop
//! - [`byte_level`]: Bijective byte ↔ printable-character mapping
//! - [`merges`]: Ranked merge-rule table
//! - [`vocab`]: Bidirectional token-string ↔ id vocabulary
//! - [`config`]: Tokenizer configuration (eos/pad/unk names, added tokens)

pub mod bpe;
pub mod byte_level;
pub mod config;
pub mod merges;
mod tokenizer;
pub mod vocab;

pub use bpe::byte_pair_merge;
pub use byte_level::{byte_for_char, char_for_byte, map_bytes, unmap_chars};
pub use config::{AddedTokenDef, TokenizerConfig};
pub use merges::MergeRanks;
pub use tokenizer::{InitError, Tokenizer, PRETOKENIZE_PATTERN};
pub use vocab::Vocabulary;
