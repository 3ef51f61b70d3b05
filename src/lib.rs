//! bytepair - byte-level BPE tokenizer for GPT-2 style vocabularies.
//!
//! Loads the three HuggingFace artifacts (`vocab.json`, `merges.txt`,
//! `tokenizer_config.json`) and exposes encode/decode over token IDs:
//! - Byte-to-unicode remapping so arbitrary bytes survive BPE losslessly
//! - fancy-regex pretokenization (GPT-2 contraction/word/number pattern)
//! - Aho-Corasick special token matching
//! - LRU cache for repeated chunks
//! - FxHashMap for fast lookups
//! - Rayon parallelism for batch encoding

pub mod core;

pub use crate::core::{InitError, Tokenizer, PRETOKENIZE_PATTERN};
