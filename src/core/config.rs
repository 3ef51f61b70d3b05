//! Tokenizer configuration (`tokenizer_config.json`).
//!
//! Only the fields the tokenizer consumes are modeled: the eos/pad/unk token
//! names and the `added_tokens_decoder` table. Everything else in a
//! HuggingFace config (chat templates, model max length, ...) is ignored.

use serde::Deserialize;
use std::collections::HashMap;

/// One entry of `added_tokens_decoder`: a token injected on top of the base
/// vocabulary, optionally flagged as special.
#[derive(Debug, Clone, Deserialize)]
pub struct AddedTokenDef {
    pub content: String,
    #[serde(default)]
    pub special: bool,
}

/// Parsed `tokenizer_config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenizerConfig {
    pub eos_token: String,
    pub pad_token: String,
    pub unk_token: String,
    /// Map of string-encoded token id → added token definition.
    #[serde(default)]
    pub added_tokens_decoder: HashMap<String, AddedTokenDef>,
}

impl TokenizerConfig {
    /// Added tokens as `(id, definition)` pairs, sorted by id.
    ///
    /// Sorting makes the vocabulary merge deterministic when two added
    /// tokens collide on content. Fails on a key that is not a decimal id.
    pub fn added_tokens(&self) -> Result<Vec<(u32, &AddedTokenDef)>, String> {
        let mut out: Vec<(u32, &AddedTokenDef)> = Vec::with_capacity(self.added_tokens_decoder.len());
        for (key, def) in &self.added_tokens_decoder {
            let id: u32 = key
                .parse()
                .map_err(|_| format!("added_tokens_decoder key {key:?} is not a token id"))?;
            out.push((id, def));
        }
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }
}
