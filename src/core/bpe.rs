//! Greedy byte-pair merge loop.
//!
//! Operates on a chunk that has already been mapped through the byte-level
//! alphabet, treating it as a sequence of single-character symbols. Each
//! pass finds the lowest-ranked adjacent pair present anywhere in the
//! sequence and merges every non-overlapping occurrence of it, left to
//! right. Passes repeat until no remaining pair has a merge rule. Symbols
//! produced by one pass participate in the next, so merges compound.
//!
//! Every pass shrinks the sequence by at least one symbol, so the loop runs
//! at most `len - 1` times and always terminates.

use rustc_hash::FxHashSet;

use super::merges::MergeRanks;

/// Distinct adjacent symbol pairs currently present in the word.
fn adjacent_pairs(word: &[String]) -> FxHashSet<(String, String)> {
    word.windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect()
}

/// Run BPE over a byte-mapped chunk, returning the final symbol strings.
pub fn byte_pair_merge(ranks: &MergeRanks, mapped: &str) -> Vec<String> {
    let mut word: Vec<String> = mapped.chars().map(String::from).collect();

    while word.len() > 1 {
        let best = adjacent_pairs(&word)
            .into_iter()
            .filter_map(|pair| ranks.rank_pair(&pair).map(|rank| (rank, pair)))
            .min_by_key(|(rank, _)| *rank);
        let Some((_, (left, right))) = best else {
            break;
        };

        let mut merged = Vec::with_capacity(word.len() - 1);
        let mut i = 0;
        while i < word.len() {
            if i + 1 < word.len() && word[i] == left && word[i + 1] == right {
                merged.push(format!("{left}{right}"));
                i += 2;
            } else {
                merged.push(std::mem::take(&mut word[i]));
                i += 1;
            }
        }
        word = merged;
    }

    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merges_compound_across_passes() {
        let ranks = MergeRanks::parse("h e\nhe l\nhel l\nhell o\n");
        assert_eq!(byte_pair_merge(&ranks, "hello"), symbols(&["hello"]));
    }

    #[test]
    fn unranked_pairs_are_left_alone() {
        let ranks = MergeRanks::parse("a b\n");
        assert_eq!(byte_pair_merge(&ranks, "abc"), symbols(&["ab", "c"]));
        assert_eq!(byte_pair_merge(&ranks, "xyz"), symbols(&["x", "y", "z"]));
    }

    #[test]
    fn lowest_rank_wins_each_pass() {
        // "b c" outranks "a b"; after merging bc, "a bc" applies.
        let ranks = MergeRanks::parse("b c\na bc\n");
        assert_eq!(byte_pair_merge(&ranks, "abc"), symbols(&["abc"]));
    }

    #[test]
    fn all_occurrences_merge_in_one_pass() {
        let ranks = MergeRanks::parse("a b\n");
        assert_eq!(
            byte_pair_merge(&ranks, "ababab"),
            symbols(&["ab", "ab", "ab"])
        );
    }

    #[test]
    fn overlapping_occurrences_do_not_double_merge() {
        // "aaa": first pass merges positions 0-1, leaving the trailing a.
        let ranks = MergeRanks::parse("a a\n");
        assert_eq!(byte_pair_merge(&ranks, "aaa"), symbols(&["aa", "a"]));
    }

    #[test]
    fn single_symbol_passes_through() {
        let ranks = MergeRanks::parse("a b\n");
        assert_eq!(byte_pair_merge(&ranks, "a"), symbols(&["a"]));
        assert!(byte_pair_merge(&ranks, "").is_empty());
    }

    #[test]
    fn terminates_on_pathological_input() {
        let ranks = MergeRanks::parse("a a\naa aa\n");
        let word = "a".repeat(64);
        let out = byte_pair_merge(&ranks, &word);
        let total: usize = out.iter().map(|s| s.len()).sum();
        assert_eq!(total, 64);
    }
}
