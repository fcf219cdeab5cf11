use crate::lock::{MultiReaderLock, ReadGuard};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound;

/// Document path -> 1-based positions, in insertion order.
pub type Postings = BTreeMap<String, Vec<usize>>;

/// Word -> postings. Words and paths iterate in ascending order.
pub type WordMap = BTreeMap<String, Postings>;

/// Thread-safe word-location index.
///
/// A `(word, path)` entry exists only when the word occurs in that document,
/// so its position list is never empty. Every operation takes the lock once,
/// which makes merges and searches atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    words: MultiReaderLock<WordMap>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `word` at `position` in the document identified by `path`.
    pub fn add(&self, word: impl Into<String>, path: impl Into<String>, position: usize) {
        self.words
            .write()
            .entry(word.into())
            .or_default()
            .entry(path.into())
            .or_default()
            .push(position);
    }

    /// Records `words` at positions `1..=words.len()` in `path`.
    pub fn add_words<S: AsRef<str>>(&self, words: &[S], path: &str) {
        if words.is_empty() {
            return;
        }
        let mut map = self.words.write();
        for (i, word) in words.iter().enumerate() {
            let word = word.as_ref();
            if let Some(positions) = map.get_mut(word).and_then(|p| p.get_mut(path)) {
                positions.push(i + 1);
                continue;
            }
            map.entry(word.to_string())
                .or_default()
                .insert(path.to_string(), vec![i + 1]);
        }
    }

    /// Moves every entry of `other` into this index under one write lock.
    ///
    /// Positions for a `(word, path)` present in both are appended after the
    /// existing ones without reordering.
    pub fn add_all(&self, other: InvertedIndex) {
        let other = other.words.into_inner();
        if other.is_empty() {
            return;
        }
        let mut words = self.words.write();
        for (word, postings) in other {
            match words.entry(word) {
                Entry::Vacant(e) => {
                    e.insert(postings);
                }
                Entry::Occupied(mut e) => {
                    let existing = e.get_mut();
                    for (path, mut positions) in postings {
                        existing.entry(path).or_default().append(&mut positions);
                    }
                }
            }
        }
    }

    /// Finds every document containing a word that starts with one of
    /// `queries`, one result per document, best first.
    pub fn partial_search<S: AsRef<str>>(&self, queries: &[S]) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = {
            let words = self.words.read();
            let mut found: HashMap<&str, SearchResult> = HashMap::new();
            for query in queries {
                let query = query.as_ref();
                let range = words.range::<str, _>((Bound::Included(query), Bound::Unbounded));
                for (word, postings) in range {
                    if !word.starts_with(query) {
                        break;
                    }
                    for (path, positions) in postings {
                        let Some(&first) = positions.first() else {
                            continue;
                        };
                        found
                            .entry(path.as_str())
                            .and_modify(|r| r.update(positions.len(), first))
                            .or_insert_with(|| {
                                SearchResult::new(path.clone(), positions.len(), first)
                            });
                    }
                }
            }
            found.into_values().collect()
        };
        results.sort();
        results
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.words.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.read().is_empty()
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.words.read().contains_key(word)
    }

    pub fn contains(&self, word: &str, path: &str) -> bool {
        self.words
            .read()
            .get(word)
            .is_some_and(|postings| postings.contains_key(path))
    }

    pub fn positions(&self, word: &str, path: &str) -> Option<Vec<usize>> {
        self.words.read().get(word)?.get(path).cloned()
    }

    pub fn words(&self) -> Vec<String> {
        self.words.read().keys().cloned().collect()
    }

    /// Paths of every document that appears anywhere in the index.
    pub fn documents(&self) -> Vec<String> {
        let words = self.words.read();
        let mut paths: Vec<String> = words
            .values()
            .flat_map(|postings| postings.keys().cloned())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Shared view of the whole map, held until the guard is dropped.
    pub(crate) fn read(&self) -> ReadGuard<'_, WordMap> {
        self.words.read()
    }
}

impl From<WordMap> for InvertedIndex {
    fn from(words: WordMap) -> Self {
        Self {
            words: MultiReaderLock::new(words),
        }
    }
}

/// One matching document for a query, ordered by descending frequency, then
/// ascending earliest position, then ascending path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    path: String,
    frequency: usize,
    position: usize,
}

impl SearchResult {
    pub fn new(path: impl Into<String>, frequency: usize, position: usize) -> Self {
        Self {
            path: path.into(),
            frequency,
            position,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Total occurrences of every matched word in this document.
    pub fn frequency(&self) -> usize {
        self.frequency
    }

    /// Earliest position of any matched word in this document.
    pub fn position(&self) -> usize {
        self.position
    }

    fn update(&mut self, frequency: usize, position: usize) {
        self.frequency += frequency;
        self.position = self.position.min(position);
    }
}

impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .frequency
            .cmp(&self.frequency)
            .then(self.position.cmp(&other.position))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\", {}, {}", self.path, self.frequency, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InvertedIndex {
        let index = InvertedIndex::new();
        index.add("word", "a", 3);
        index.add("world", "b", 1);
        index.add("word", "a", 7);
        index.add("other", "a", 1);
        index
    }

    #[test]
    fn prefix_search_covers_all_matching_words() {
        let results = sample().partial_search(&["wor"]);
        assert_eq!(
            results,
            vec![SearchResult::new("a", 2, 3), SearchResult::new("b", 1, 1)]
        );
    }

    #[test]
    fn one_result_per_document_across_words() {
        let index = sample();
        index.add("worm", "a", 2);
        let results = index.partial_search(&["wor"]);
        assert_eq!(results[0], SearchResult::new("a", 3, 2));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn prefix_scan_stops_past_matching_range() {
        let results = sample().partial_search(&["o", "zzz"]);
        assert_eq!(results, vec![SearchResult::new("a", 1, 1)]);
        assert!(sample().partial_search(&["x"]).is_empty());
    }

    #[test]
    fn sort_order_breaks_ties_by_path() {
        let mut results = vec![
            SearchResult::new("b", 2, 5),
            SearchResult::new("a", 2, 5),
            SearchResult::new("c", 1, 1),
            SearchResult::new("d", 3, 9),
            SearchResult::new("e", 2, 4),
        ];
        results.sort();
        let paths: Vec<_> = results.iter().map(SearchResult::path).collect();
        assert_eq!(paths, vec!["d", "e", "a", "b", "c"]);
    }

    #[test]
    fn add_all_appends_without_reordering() {
        let index = InvertedIndex::new();
        index.add("x", "p", 5);
        let other = InvertedIndex::new();
        other.add("x", "p", 2);
        other.add("x", "q", 1);
        other.add("y", "p", 4);
        index.add_all(other);
        assert_eq!(index.positions("x", "p"), Some(vec![5, 2]));
        assert_eq!(index.positions("x", "q"), Some(vec![1]));
        assert_eq!(index.positions("y", "p"), Some(vec![4]));
        assert_eq!(index.documents(), vec!["p", "q"]);
    }

    #[test]
    fn add_words_counts_from_one() {
        let index = InvertedIndex::new();
        index.add_words(&["a", "b", "a"], "doc");
        assert_eq!(index.positions("a", "doc"), Some(vec![1, 3]));
        assert_eq!(index.positions("b", "doc"), Some(vec![2]));
        assert!(index.contains("b", "doc"));
        assert!(!index.contains("b", "other"));
        assert!(!index.contains("missing", "doc"));
        index.add_words::<&str>(&[], "empty");
        assert_eq!(index.documents(), vec!["doc"]);
    }

    #[test]
    fn display_matches_results_format() {
        assert_eq!(SearchResult::new("/x/y.txt", 2, 3).to_string(), "\"/x/y.txt\", 2, 3");
    }
}
