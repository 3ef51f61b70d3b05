//! Ranked merge-rule table loaded from `merges.txt`.
//!
//! Each non-blank, non-comment line of the merge-rules text holds one rule,
//! `<left> <right>`, and file order is priority order: the first rule gets
//! rank 0, the next rank 1, and so on. Lower rank wins during merging. A
//! pair absent from the table is never merged.

use rustc_hash::FxHashMap;

/// Merge-rule table mapping an adjacent symbol pair to its priority rank.
#[derive(Debug, Clone, Default)]
pub struct MergeRanks {
    ranks: FxHashMap<(String, String), u32>,
}

impl MergeRanks {
    /// Parse merge-rules text.
    ///
    /// Blank lines, `#` comment lines (including the `#version:` header
    /// HuggingFace writes), and lines without exactly two fields are skipped.
    pub fn parse(text: &str) -> Self {
        let mut ranks = FxHashMap::default();
        let mut rank = 0u32;
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split(' ');
            let (Some(left), Some(right), None) = (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            ranks.insert((left.to_string(), right.to_string()), rank);
            rank += 1;
        }
        Self { ranks }
    }

    /// Rank of a pair, or `None` if the pair has no merge rule.
    #[inline]
    pub fn rank(&self, left: &str, right: &str) -> Option<u32> {
        self.ranks.get(&(left.to_string(), right.to_string())).copied()
    }

    /// Rank lookup keyed by an already-built pair, avoiding per-probe
    /// allocation in the merge loop.
    #[inline]
    pub fn rank_pair(&self, pair: &(String, String)) -> Option<u32> {
        self.ranks.get(pair).copied()
    }

    /// Number of merge rules.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
