//! Bidirectional token-string ↔ id vocabulary.
//!
//! Built once at initialization from the base `vocab.json` table plus the
//! configuration's `added_tokens_decoder`, then immutable. Added tokens are
//! merged by content string and may overwrite base entries; the subset
//! flagged `special` forms the special-token set that bypasses byte mapping
//! and BPE entirely.

use rustc_hash::{FxHashMap, FxHashSet};

use super::config::TokenizerConfig;
use super::tokenizer::InitError;

/// The complete, immutable vocabulary with resolved eos/pad/unk ids.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    encoder: FxHashMap<String, u32>,
    decoder: FxHashMap<u32, String>,
    special: FxHashSet<String>,
    eos_token_id: u32,
    pad_token_id: u32,
    unk_token_id: u32,
}

impl Vocabulary {
    /// Build the vocabulary from the base `vocab.json` text and the parsed
    /// tokenizer configuration.
    pub fn build(vocab_json: &str, config: &TokenizerConfig) -> Result<Self, InitError> {
        let mut encoder: FxHashMap<String, u32> = serde_json::from_str(vocab_json)
            .map_err(|e| InitError::MalformedConfig(format!("vocab.json: {e}")))?;

        // Base ids are unique per the file's contract; build the reverse map
        // before added tokens so id collisions resolve in the added tokens'
        // favor below.
        let mut decoder: FxHashMap<u32, String> =
            encoder.iter().map(|(s, &id)| (id, s.clone())).collect();

        let added = config
            .added_tokens()
            .map_err(InitError::MalformedConfig)?;

        let mut special = FxHashSet::default();
        for (id, def) in added {
            encoder.insert(def.content.clone(), id);
            decoder.insert(id, def.content.clone());
            if def.special {
                special.insert(def.content.clone());
            }
        }

        let resolve = |name: &str| {
            encoder
                .get(name)
                .copied()
                .ok_or_else(|| InitError::UnresolvedSpecialToken(name.to_string()))
        };
        let eos_token_id = resolve(&config.eos_token)?;
        let pad_token_id = resolve(&config.pad_token)?;
        let unk_token_id = resolve(&config.unk_token)?;

        Ok(Self {
            encoder,
            decoder,
            special,
            eos_token_id,
            pad_token_id,
            unk_token_id,
        })
    }

    /// Token id for an exact token string.
    #[inline]
    pub fn id_for_token(&self, token: &str) -> Option<u32> {
        self.encoder.get(token).copied()
    }

    /// Token string for an id, if the id is in the vocabulary.
    #[inline]
    pub fn token_for_id(&self, id: u32) -> Option<&str> {
        self.decoder.get(&id).map(String::as_str)
    }

    /// Whether a token string is a configured special token.
    #[inline]
    pub fn is_special(&self, token: &str) -> bool {
        self.special.contains(token)
    }

    /// The special token strings, sorted for deterministic iteration.
    pub fn special_tokens(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.special.iter().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    pub fn unk_token_id(&self) -> u32 {
        self.unk_token_id
    }

    /// Number of distinct token strings.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Full id range of the vocabulary: highest id plus one.
    pub fn vocab_size(&self) -> usize {
        self.decoder.keys().max().map_or(0, |&id| id as usize + 1)
    }
}
