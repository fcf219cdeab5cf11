//! Runs query lines against an [`InvertedIndex`], keeping each line's
//! results in the order the lines were first seen.

use crate::error::{Error, Result};
use crate::index::{InvertedIndex, SearchResult};
use crate::lock::MultiReaderLock;
use crate::queue::WorkQueue;
use crate::task_group::TaskGroup;
use crate::tokenizer::tokenize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Tokenizes `line` and runs a prefix search for its words.
pub fn search_line(index: &InvertedIndex, line: &str) -> Vec<SearchResult> {
    index.partial_search(&tokenize(line))
}

/// Query line -> results, iterated in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    lines: Vec<String>,
    results: HashMap<String, Vec<SearchResult>>,
}

impl QueryResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for `line`. Returns `false` if it was already present.
    pub fn insert_line(&mut self, line: &str) -> bool {
        if self.results.contains_key(line) {
            return false;
        }
        self.lines.push(line.to_string());
        self.results.insert(line.to_string(), Vec::new());
        true
    }

    /// Stores results for `line`, reserving its slot if needed.
    pub fn set_results(&mut self, line: &str, results: Vec<SearchResult>) {
        self.insert_line(line);
        self.results.insert(line.to_string(), results);
    }

    pub fn get(&self, line: &str) -> Option<&[SearchResult]> {
        self.results.get(line).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SearchResult])> + '_ {
        self.lines.iter().map(move |line| {
            let results = self.results.get(line).map(Vec::as_slice).unwrap_or_default();
            (line.as_str(), results)
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(path, e))
}

/// Single-threaded query executor.
#[derive(Debug, Default)]
pub struct QueryParser {
    results: QueryResults,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, line: &str, index: &InvertedIndex) {
        if self.results.insert_line(line) {
            self.results.set_results(line, search_line(index, line));
        }
    }

    /// Searches every line of the file at `path`; returns the line count.
    pub fn parse_file(&mut self, path: &Path, index: &InvertedIndex) -> Result<usize> {
        let lines = read_lines(path)?;
        for line in &lines {
            self.add_line(line, index);
        }
        info!(queries = self.results.len(), "queries complete");
        Ok(lines.len())
    }

    pub fn results(&self) -> &QueryResults {
        &self.results
    }

    pub fn into_results(self) -> QueryResults {
        self.results
    }
}

/// Query executor that searches each line on a [`WorkQueue`].
///
/// A line's slot is reserved before its task is scheduled, so output order
/// follows input order no matter which task finishes first.
pub struct MultithreadedQueryParser {
    index: Arc<InvertedIndex>,
    results: Arc<MultiReaderLock<QueryResults>>,
    queue: WorkQueue,
    pending: Arc<TaskGroup>,
}

impl MultithreadedQueryParser {
    pub fn new(index: Arc<InvertedIndex>, threads: usize) -> Self {
        Self {
            index,
            results: Arc::new(MultiReaderLock::default()),
            queue: WorkQueue::with_name(threads, "query-parser"),
            pending: TaskGroup::new(),
        }
    }

    /// Schedules a search for `line` unless the same line was already added.
    pub fn add_line(&self, line: &str) -> Result<()> {
        if !self.results.write().insert_line(line) {
            debug!(line, "duplicate query skipped");
            return Ok(());
        }

        debug!(line, "task created");
        let ticket = self.pending.enter();
        let index = Arc::clone(&self.index);
        let results = Arc::clone(&self.results);
        let line = line.to_string();
        self.queue.execute(move || {
            let _ticket = ticket;
            let found = search_line(&index, &line);
            results.write().set_results(&line, found);
            debug!(%line, "task finished");
        })
    }

    /// Schedules every line of the file at `path`; returns the line count.
    pub fn parse_file(&self, path: &Path) -> Result<usize> {
        let lines = read_lines(path)?;
        for line in &lines {
            self.add_line(line)?;
        }
        Ok(lines.len())
    }

    /// Snapshot of the results gathered so far.
    pub fn results(&self) -> QueryResults {
        self.results.read().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    pub fn finish(&self) {
        self.pending.wait_idle();
    }

    pub fn shutdown(&self) {
        debug!("shutting down query parser");
        self.finish();
        self.queue.shutdown();
        self.queue.join();
        info!(queries = self.results.read().len(), "queries complete");
    }
}

/// Runs the query file at `path` against `index`, on `threads` workers when
/// given, otherwise on the calling thread.
pub fn run_query_file(
    index: &Arc<InvertedIndex>,
    path: &Path,
    threads: Option<usize>,
) -> Result<QueryResults> {
    match threads {
        Some(threads) => {
            let parser = MultithreadedQueryParser::new(Arc::clone(index), threads);
            let outcome = parser.parse_file(path);
            parser.shutdown();
            outcome?;
            Ok(parser.results())
        }
        None => {
            let mut parser = QueryParser::new();
            parser.parse_file(path, index)?;
            Ok(parser.into_results())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn index() -> Arc<InvertedIndex> {
        let index = InvertedIndex::new();
        index.add_words(&["apple", "banana", "apricot", "apple"], "/a");
        index.add_words(&["banana", "cherry"], "/b");
        Arc::new(index)
    }

    #[test]
    fn preserves_first_seen_order() {
        let parser = MultithreadedQueryParser::new(index(), 4);
        let lines: Vec<String> = (0..50)
            .map(|i| match i % 3 {
                0 => format!("ap {i}"),
                1 => format!("Banana {i}"),
                _ => format!("cher {i}"),
            })
            .collect();
        for line in &lines {
            parser.add_line(line).unwrap();
        }
        parser.shutdown();

        let results = parser.results();
        assert_eq!(results.lines(), lines.as_slice());
        assert_eq!(
            results.get("ap 0").unwrap(),
            &[SearchResult::new("/a", 3, 1)]
        );
        assert_eq!(
            results.get("Banana 1").unwrap(),
            &[SearchResult::new("/b", 1, 1), SearchResult::new("/a", 1, 2)]
        );
    }

    #[test]
    fn duplicate_lines_are_searched_once() {
        let parser = MultithreadedQueryParser::new(index(), 2);
        parser.add_line("apple").unwrap();
        parser.add_line("cherry").unwrap();
        parser.add_line("apple").unwrap();
        parser.shutdown();
        assert_eq!(parser.results().lines(), &["apple", "cherry"]);
    }

    #[test]
    fn sequential_and_multithreaded_agree() {
        let dir = tempdir().unwrap();
        let queries = dir.path().join("queries.txt");
        fs::write(&queries, "banana\nap\n\nzzz\nb c\nbanana\n").unwrap();

        let index = index();
        let sequential = run_query_file(&index, &queries, None).unwrap();
        let threaded = run_query_file(&index, &queries, Some(3)).unwrap();
        assert_eq!(sequential, threaded);
        assert_eq!(sequential.lines(), &["banana", "ap", "", "zzz", "b c"]);
        assert!(sequential.get("").unwrap().is_empty());
        assert!(sequential.get("zzz").unwrap().is_empty());
    }

    #[test]
    fn missing_query_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = run_query_file(&index(), &dir.path().join("none.txt"), Some(2));
        assert!(matches!(err, Err(Error::Io { .. })));
    }
}
