//! Main tokenizer interface.
//!
//! Composes the vocabulary, merge table, byte-level alphabet, pretokenizer,
//! and special-token matcher into `encode`/`decode`. Construction loads and
//! validates all three data sources eagerly; after that, encoding and
//! decoding never fail.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aho_corasick::AhoCorasick;
use log::warn;
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::FxHasher;
use thiserror::Error;
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use super::bpe::byte_pair_merge;
use super::byte_level;
use super::config::TokenizerConfig;
use super::merges::MergeRanks;
use super::vocab::Vocabulary;

/// Errors that can occur while constructing a [`Tokenizer`].
///
/// Construction is the only fallible operation; a tokenizer that failed to
/// build must not be used, and one that built successfully never fails to
/// encode or decode.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("missing tokenizer data file {}: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tokenizer data: {0}")]
    MalformedConfig(String),
    #[error("configured token {0:?} is not in the vocabulary")]
    UnresolvedSpecialToken(String),
    #[error("pretokenizer pattern: {0}")]
    Pattern(#[from] fancy_regex::Error),
    #[error("special token matcher: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),
}

/// GPT-2 style pretokenization pattern.
///
/// Alternatives are tried in order at each position: contraction suffixes,
/// letter runs with an optional single non-letter prefix, digit runs,
/// punctuation runs with trailing newlines, newline runs, trailing
/// whitespace, then any whitespace. Matches tile the input with no gaps.
pub const PRETOKENIZE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}+| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Default size of the per-chunk merge cache.
const DEFAULT_CACHE_SIZE: usize = 4096;

/// Byte-level BPE tokenizer for GPT-2 style vocabularies.
///
/// Built from the three HuggingFace artifacts: the base vocabulary
/// (`vocab.json`), the ranked merge rules (`merges.txt`), and the tokenizer
/// configuration (`tokenizer_config.json`) carrying added/special tokens and
/// the eos/pad/unk names.
///
/// All tables are immutable after construction. The only mutable state is
/// the chunk cache, which memoizes BPE results and sits behind a mutex, so a
/// shared tokenizer can be used from multiple threads.
pub struct Tokenizer {
    vocab: Vocabulary,
    merges: MergeRanks,
    pretokenizer: fancy_regex::Regex,
    special_matcher: Option<AhoCorasick>,
    /// Token id per matcher pattern index.
    special_token_ids: Vec<u32>,
    chunk_cache: Mutex<LruCache<u64, Vec<u32>>>,
    cache_size: usize,
}

impl Tokenizer {
    /// Build a tokenizer from in-memory vocabulary, merge-rules, and
    /// configuration text.
    pub fn new(
        vocab_json: &str,
        merges_text: &str,
        config_json: &str,
    ) -> Result<Self, InitError> {
        Self::with_cache_size(vocab_json, merges_text, config_json, DEFAULT_CACHE_SIZE)
    }

    /// Build a tokenizer with a custom chunk-cache capacity.
    pub fn with_cache_size(
        vocab_json: &str,
        merges_text: &str,
        config_json: &str,
        cache_size: usize,
    ) -> Result<Self, InitError> {
        let config: TokenizerConfig = serde_json::from_str(config_json)
            .map_err(|e| InitError::MalformedConfig(format!("tokenizer_config.json: {e}")))?;
        let vocab = Vocabulary::build(vocab_json, &config)?;
        let merges = MergeRanks::parse(merges_text);
        let pretokenizer = fancy_regex::Regex::new(PRETOKENIZE_PATTERN)?;

        // Special tokens are matched as literal substrings; leftmost-longest
        // keeps a token from being shadowed by a shorter prefix of itself.
        let special_strings: Vec<String> = vocab
            .special_tokens()
            .into_iter()
            .map(str::to_string)
            .collect();
        let (special_matcher, special_token_ids) = if special_strings.is_empty() {
            (None, Vec::new())
        } else {
            let matcher = AhoCorasick::builder()
                .match_kind(aho_corasick::MatchKind::LeftmostLongest)
                .build(&special_strings)?;
            let mut ids = Vec::with_capacity(special_strings.len());
            for s in &special_strings {
                let id = vocab
                    .id_for_token(s)
                    .ok_or_else(|| InitError::UnresolvedSpecialToken(s.clone()))?;
                ids.push(id);
            }
            (Some(matcher), ids)
        };

        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap();
        Ok(Self {
            vocab,
            merges,
            pretokenizer,
            special_matcher,
            special_token_ids,
            chunk_cache: Mutex::new(LruCache::new(capacity)),
            cache_size,
        })
    }

    /// Build a tokenizer from the three files on disk.
    pub fn from_files(
        vocab_path: impl AsRef<Path>,
        merges_path: impl AsRef<Path>,
        config_path: impl AsRef<Path>,
    ) -> Result<Self, InitError> {
        let vocab_json = read_data_file(vocab_path.as_ref())?;
        let merges_text = read_data_file(merges_path.as_ref())?;
        let config_json = read_data_file(config_path.as_ref())?;
        Self::new(&vocab_json, &merges_text, &config_json)
    }

    /// Encode text to token ids.
    ///
    /// The text is NFC-normalized first, split around special tokens, and
    /// the remaining segments are pretokenized and run through BPE. Symbols
    /// with no vocabulary entry become the unk token id; the call itself
    /// never fails.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        if text.is_empty() {
            return Vec::new();
        }

        let text: Cow<str> = if is_nfc_quick(text.chars()) == IsNormalized::Yes {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.nfc().collect())
        };

        let mut ids = Vec::new();
        match &self.special_matcher {
            None => self.encode_segment(&text, &mut ids),
            Some(matcher) => {
                let mut last_end = 0;
                for m in matcher.find_iter(text.as_ref()) {
                    if m.start() > last_end {
                        self.encode_segment(&text[last_end..m.start()], &mut ids);
                    }
                    ids.push(self.special_token_ids[m.pattern().as_usize()]);
                    last_end = m.end();
                }
                if last_end < text.len() {
                    self.encode_segment(&text[last_end..], &mut ids);
                }
            }
        }
        ids
    }

    /// Decode token ids back to text.
    ///
    /// Ids outside the vocabulary are skipped, as are mapped characters
    /// outside the byte alphabet. Special tokens are appended verbatim;
    /// everything else is unmapped to bytes and decoded as UTF-8 (lossily,
    /// so a stray partial sequence cannot make the call fail). Bytes
    /// accumulate across adjacent tokens, so a multi-byte character split
    /// over two tokens still comes out intact.
    pub fn decode(&self, ids: &[u32]) -> String {
        let mut out = String::new();
        let mut pending: Vec<u8> = Vec::new();
        for &id in ids {
            let Some(token) = self.vocab.token_for_id(id) else {
                continue;
            };
            if self.vocab.is_special(token) {
                flush_utf8(&mut out, &mut pending);
                out.push_str(token);
            } else {
                pending.extend(byte_level::unmap_chars(token));
            }
        }
        flush_utf8(&mut out, &mut pending);
        out
    }

    /// Encode each pretokenizer match within one text segment.
    fn encode_segment(&self, segment: &str, ids: &mut Vec<u32>) {
        for m in self.pretokenizer.find_iter(segment) {
            let Ok(m) = m else { continue };
            self.encode_chunk(m.as_str(), ids);
        }
    }

    /// Byte-map one chunk, run BPE, and look the symbols up in the vocabulary.
    fn encode_chunk(&self, chunk: &str, ids: &mut Vec<u32>) {
        let mapped = byte_level::map_bytes(chunk.as_bytes());

        // Fast path: the whole chunk is a known token.
        if let Some(id) = self.vocab.id_for_token(&mapped) {
            ids.push(id);
            return;
        }

        let key = hash_str(&mapped);
        if let Ok(mut cache) = self.chunk_cache.lock() {
            if let Some(cached) = cache.get(&key) {
                ids.extend_from_slice(cached);
                return;
            }
        }

        let symbols = byte_pair_merge(&self.merges, &mapped);
        let mut chunk_ids = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            match self.vocab.id_for_token(symbol) {
                Some(id) => chunk_ids.push(id),
                None => {
                    warn!("symbol {symbol:?} not in vocabulary, substituting unk token");
                    chunk_ids.push(self.vocab.unk_token_id());
                }
            }
        }

        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.put(key, chunk_ids.clone());
        }
        ids.extend_from_slice(&chunk_ids);
    }

    /// Encode a batch of texts in parallel.
    pub fn encode_batch(&self, texts: &[String]) -> Vec<Vec<u32>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Decode a batch of token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Vec<String> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Id of the configured end-of-sequence token.
    pub fn eos_token_id(&self) -> u32 {
        self.vocab.eos_token_id()
    }

    /// Id of the configured padding token.
    pub fn pad_token_id(&self) -> u32 {
        self.vocab.pad_token_id()
    }

    /// Id of the configured unknown token.
    pub fn unk_token_id(&self) -> u32 {
        self.vocab.unk_token_id()
    }

    /// The vocabulary (including added and special tokens).
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Full id range of the vocabulary: highest id plus one.
    pub fn vocab_size(&self) -> usize {
        self.vocab.vocab_size()
    }

    /// Number of merge rules.
    pub fn merge_count(&self) -> usize {
        self.merges.len()
    }

    /// Clear the chunk cache.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.clear();
        }
    }

    /// Number of chunks currently memoized.
    pub fn cache_len(&self) -> usize {
        self.chunk_cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        // The cache is per-instance state; clones start cold.
        let capacity = NonZeroUsize::new(self.cache_size.max(1)).unwrap();
        Self {
            vocab: self.vocab.clone(),
            merges: self.merges.clone(),
            pretokenizer: self.pretokenizer.clone(),
            special_matcher: self.special_matcher.clone(),
            special_token_ids: self.special_token_ids.clone(),
            chunk_cache: Mutex::new(LruCache::new(capacity)),
            cache_size: self.cache_size,
        }
    }
}

/// FxHasher hash of a mapped chunk, used as the cache key.
#[inline]
fn hash_str(s: &str) -> u64 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Append pending bytes to the output as (lossy) UTF-8.
fn flush_utf8(out: &mut String, pending: &mut Vec<u8>) {
    if !pending.is_empty() {
        out.push_str(&String::from_utf8_lossy(pending));
        pending.clear();
    }
}

fn read_data_file(path: &Path) -> Result<String, InitError> {
    std::fs::read_to_string(path).map_err(|source| InitError::MissingFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &str = r#"{
        "Hello": 1, "Ġworld": 2,
        "a": 3, "c": 4, "Ã©": 5,
        "H": 6, "e": 7, "l": 8, "o": 9, "Ġ": 10,
        "w": 11, "r": 12, "d": 13,
        "He": 14, "Hel": 15, "Hell": 16,
        "Ġw": 17, "Ġwo": 18, "Ġwor": 19, "Ġworl": 20,
        "1": 21, "2": 22, "3": 23, "123": 24, "Ċ": 25
    }"#;

    const MERGES: &str = "\
#version: 0.2
H e
He l
Hel l
Hell o
Ġ w
Ġw o
Ġwo r
Ġwor l
Ġworl d
Ã ©
1 2
12 3
";

    const CONFIG: &str = r#"{
        "eos_token": "<|endoftext|>",
        "pad_token": "<|endoftext|>",
        "unk_token": "<|endoftext|>",
        "added_tokens_decoder": {
            "0": { "content": "<|endoftext|>", "special": true },
            "30": { "content": "<|user|>", "special": true },
            "31": { "content": "<|assistant|>", "special": true }
        }
    }"#;

    fn make_tokenizer() -> Tokenizer {
        Tokenizer::new(VOCAB, MERGES, CONFIG).unwrap()
    }

    #[test]
    fn encode_hello_world() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.encode("Hello world"), vec![1, 2]);
    }

    #[test]
    fn decode_hello_world() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.decode(&[1, 2]), "Hello world");
    }

    #[test]
    fn empty_string_round_trips() {
        let tokenizer = make_tokenizer();
        assert!(tokenizer.encode("").is_empty());
        assert_eq!(tokenizer.decode(&[]), "");
    }

    #[test]
    fn special_token_encodes_to_single_id() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.encode("Hello<|user|> world"), vec![1, 30, 2]);
        assert_eq!(tokenizer.decode(&[1, 30, 2]), "Hello<|user|> world");
    }

    #[test]
    fn unknown_symbol_becomes_unk_id() {
        let tokenizer = make_tokenizer();
        // "abc" has no whole-chunk entry and no merges; "b" is not in the
        // vocabulary, so it falls back to the unk id between "a" and "c".
        assert_eq!(tokenizer.encode("abc"), vec![3, 0, 4]);
    }

    #[test]
    fn decode_skips_unknown_ids() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.decode(&[1, 9999, 2]), "Hello world");
    }

    #[test]
    fn nfc_normalization_unifies_decomposed_input() {
        let tokenizer = make_tokenizer();
        let composed = tokenizer.encode("\u{00E9}");
        let decomposed = tokenizer.encode("e\u{0301}");
        assert_eq!(composed, vec![5]);
        assert_eq!(composed, decomposed);
    }

    #[test]
    fn whole_chunk_fast_path() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.encode("123"), vec![24]);
    }

    #[test]
    fn newline_round_trips() {
        let tokenizer = make_tokenizer();
        let ids = tokenizer.encode("Hello\nHello");
        assert_eq!(ids, vec![1, 25, 1]);
        assert_eq!(tokenizer.decode(&ids), "Hello\nHello");
    }

    #[test]
    fn encode_is_deterministic_with_cache() {
        let tokenizer = make_tokenizer();
        let first = tokenizer.encode("Hello world Hello world");
        let second = tokenizer.encode("Hello world Hello world");
        assert_eq!(first, second);
    }

    #[test]
    fn cache_fills_and_clears() {
        let tokenizer = make_tokenizer();
        tokenizer.encode("abc");
        assert!(tokenizer.cache_len() > 0);
        tokenizer.clear_cache();
        assert_eq!(tokenizer.cache_len(), 0);
    }

    #[test]
    fn resolved_token_id_accessors() {
        let tokenizer = make_tokenizer();
        assert_eq!(tokenizer.eos_token_id(), 0);
        assert_eq!(tokenizer.pad_token_id(), 0);
        assert_eq!(tokenizer.unk_token_id(), 0);
    }

    #[test]
    fn missing_file_error_carries_path() {
        let result = Tokenizer::from_files(
            "/nonexistent/vocab.json",
            "/nonexistent/merges.txt",
            "/nonexistent/config.json",
        );
        assert!(matches!(result, Err(InitError::MissingFile { ref path, .. })
            if path.ends_with("vocab.json")));
    }

    #[test]
    fn malformed_config_fails_construction() {
        assert!(matches!(
            Tokenizer::new(VOCAB, MERGES, "{ not json"),
            Err(InitError::MalformedConfig(_))
        ));
    }

    #[test]
    fn clone_starts_with_cold_cache() {
        let tokenizer = make_tokenizer();
        tokenizer.encode("abc");
        let clone = tokenizer.clone();
        assert_eq!(clone.cache_len(), 0);
        assert_eq!(clone.encode("Hello world"), vec![1, 2]);
    }

    #[test]
    fn batch_encode_matches_sequential() {
        let tokenizer = make_tokenizer();
        let texts = vec!["Hello world".to_string(), "123".to_string()];
        let batch = tokenizer.encode_batch(&texts);
        assert_eq!(batch, vec![tokenizer.encode("Hello world"), tokenizer.encode("123")]);
    }
}
