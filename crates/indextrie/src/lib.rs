//! A trie-backed inverted index: `word -> [(file, occurrence count, sorted
//! line numbers)]`.
//!
//! Each trie node keeps its children in a `BTreeMap<char, NodeId>`, which
//! gives the same ascending-order traversal the original sibling-chain
//! design relied on for its lexicographic tie-breaks, without having to
//! reimplement sibling pointers by hand.

use std::collections::BTreeMap;

type NodeId = usize;

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<char, NodeId>,
    postings: Vec<Posting>,
}

/// One file's hits for a given word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub filename: String,
    /// Total number of times the word occurs in this file (not the
    /// number of distinct lines).
    pub count: usize,
    pub lines: Vec<usize>,
}

impl Posting {
    fn new(filename: String, line: usize) -> Self {
        Posting { filename, count: 1, lines: vec![line] }
    }

    fn record(&mut self, line: usize) {
        self.count += 1;
        if let Err(pos) = self.lines.binary_search(&line) {
            self.lines.insert(pos, line);
        }
    }
}

/// Which extreme [`Trie::max_min_count`] should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    pub fn new() -> Self {
        Trie { nodes: vec![TrieNode::default()] }
    }

    /// Records one occurrence of `word` at `line` in `filename`.
    pub fn insert(&mut self, word: &str, filename: &str, line: usize) {
        let mut node = 0;
        for ch in word.chars() {
            node = *self.nodes[node].children.entry(ch).or_insert_with(|| {
                self.nodes.push(TrieNode::default());
                self.nodes.len() - 1
            });
        }
        insert_posting(&mut self.nodes[node].postings, filename, line);
    }

    /// Looks up the postings list for an exact word, without modifying
    /// the trie.
    pub fn find(&self, word: &str) -> Option<&[Posting]> {
        self.find_node(word).map(|id| self.nodes[id].postings.as_slice())
    }

    fn find_node(&self, word: &str) -> Option<NodeId> {
        let mut node = 0;
        for ch in word.chars() {
            node = *self.nodes[node].children.get(&ch)?;
        }
        Some(node)
    }

    /// Merges the postings lists of several words (a multi-keyword
    /// search) into one list: a file appears once, with its line numbers
    /// and counts combined across every keyword that matched it.
    pub fn merge(words: &[&str], trie: &Trie) -> Vec<Posting> {
        let mut merged: Vec<Posting> = Vec::new();
        for word in words {
            if let Some(postings) = trie.find(word) {
                for posting in postings {
                    match merged.binary_search_by(|p| p.filename.as_str().cmp(posting.filename.as_str())) {
                        Ok(idx) => {
                            merged[idx].count += posting.count;
                            for &line in &posting.lines {
                                if let Err(pos) = merged[idx].lines.binary_search(&line) {
                                    merged[idx].lines.insert(pos, line);
                                }
                            }
                        }
                        Err(idx) => merged.insert(idx, posting.clone()),
                    }
                }
            }
        }
        merged
    }

    /// Scans `word`'s postings list for the file with the largest/
    /// smallest occurrence count. On a tie, the lexicographically
    /// smallest filename wins, which falls out naturally from postings
    /// already being kept sorted by filename and only replacing the
    /// current best on a strict improvement. `None` if `word` was never
    /// indexed.
    pub fn max_min_count(&self, word: &str, extreme: Extreme) -> Option<(String, usize)> {
        let postings = self.find(word)?;
        let mut best: Option<(String, usize)> = None;

        for posting in postings {
            let improves = match (extreme, best.as_ref()) {
                (_, None) => true,
                (Extreme::Max, Some((_, b))) => posting.count > *b,
                (Extreme::Min, Some((_, b))) => posting.count < *b,
            };
            if improves {
                best = Some((posting.filename.clone(), posting.count));
            }
        }

        best
    }
}

fn insert_posting(postings: &mut Vec<Posting>, filename: &str, line: usize) {
    match postings.binary_search_by(|p| p.filename.as_str().cmp(filename)) {
        Ok(idx) => postings[idx].record(line),
        Err(idx) => postings.insert(idx, Posting::new(filename.to_owned(), line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find_round_trips() {
        let mut trie = Trie::new();
        trie.insert("rust", "a.txt", 0);
        trie.insert("rust", "a.txt", 3);
        trie.insert("rust", "b.txt", 1);

        let postings = trie.find("rust").unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].filename, "a.txt");
        assert_eq!(postings[0].count, 2);
        assert_eq!(postings[0].lines, vec![0, 3]);
        assert_eq!(postings[1].filename, "b.txt");
    }

    #[test]
    fn find_missing_word_is_none() {
        let trie = Trie::new();
        assert!(trie.find("nope").is_none());
    }

    #[test]
    fn merge_unions_files_across_keywords() {
        let mut trie = Trie::new();
        trie.insert("cat", "a.txt", 0);
        trie.insert("dog", "a.txt", 1);
        trie.insert("dog", "b.txt", 0);

        let merged = Trie::merge(&["cat", "dog"], &trie);
        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|p| p.filename == "a.txt").unwrap();
        assert_eq!(a.count, 2);
        assert_eq!(a.lines, vec![0, 1]);
    }

    #[test]
    fn max_min_count_breaks_ties_lexicographically() {
        let mut trie = Trie::new();
        trie.insert("foo", "y/f3", 0);
        trie.insert("foo", "y/f3", 1);
        trie.insert("foo", "x/f1", 0);
        trie.insert("foo", "x/f1", 1);

        // x/f1 and y/f3 both occur twice; x/f1 wins both ways
        assert_eq!(trie.max_min_count("foo", Extreme::Max), Some(("x/f1".into(), 2)));
        assert_eq!(trie.max_min_count("foo", Extreme::Min), Some(("x/f1".into(), 2)));
    }

    #[test]
    fn max_min_count_picks_the_real_extreme() {
        let mut trie = Trie::new();
        trie.insert("foo", "x/f1", 0);
        trie.insert("foo", "x/f1", 1);
        trie.insert("foo", "x/f1", 2);
        trie.insert("foo", "x/f2", 0);
        trie.insert("foo", "y/f3", 0);
        trie.insert("foo", "y/f3", 1);
        trie.insert("foo", "y/f3", 2);

        assert_eq!(trie.max_min_count("foo", Extreme::Max), Some(("x/f1".into(), 3)));
        assert_eq!(trie.max_min_count("foo", Extreme::Min), Some(("x/f2".into(), 1)));
    }

    #[test]
    fn max_min_count_on_unindexed_word_is_none() {
        let trie = Trie::new();
        assert_eq!(trie.max_min_count("missing", Extreme::Max), None);
    }
}
