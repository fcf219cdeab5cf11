//! Populates an [`InvertedIndex`] from text files.

use crate::error::{Error, Result};
use crate::files::document_path;
use crate::index::InvertedIndex;
use crate::queue::WorkQueue;
use crate::task_group::TaskGroup;
use crate::tokenizer::tokenize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads `path` and returns its words in order. Invalid UTF-8 is replaced.
pub fn read_words(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    if let std::borrow::Cow::Owned(_) = text {
        warn!(path = %path.display(), "invalid UTF-8 replaced");
    }
    Ok(tokenize(&text))
}

/// Adds every word of `path` to `index`, positions counted from 1 across the
/// whole file. Returns the number of words added.
pub fn index_file(path: &Path, index: &InvertedIndex) -> Result<usize> {
    let words = read_words(path)?;
    index.add_words(&words, &document_path(path));
    Ok(words.len())
}

/// Single-threaded build: indexes each file in turn. Files that cannot be
/// read are logged and skipped. Returns the number of files indexed.
pub fn build_index(files: &[PathBuf], index: &InvertedIndex) -> usize {
    let mut indexed = 0;
    for file in files {
        match index_file(file, index) {
            Ok(words) => {
                debug!(path = %file.display(), words, "indexed file");
                indexed += 1;
            }
            Err(e) => warn!(error = %e, "skipping file"),
        }
    }
    info!(files = indexed, words = index.len(), "index build complete");
    indexed
}

/// Indexes files on a [`WorkQueue`], one task per file.
///
/// Each task fills a private index and merges it into the shared one with a
/// single [`InvertedIndex::add_all`], so the shared lock is taken once per
/// file rather than once per word.
pub struct MultithreadedIndexBuilder {
    index: Arc<InvertedIndex>,
    queue: WorkQueue,
    pending: Arc<TaskGroup>,
}

impl MultithreadedIndexBuilder {
    pub fn new(index: Arc<InvertedIndex>, threads: usize) -> Self {
        Self {
            index,
            queue: WorkQueue::with_name(threads, "index-builder"),
            pending: TaskGroup::new(),
        }
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    /// Schedules one file.
    pub fn add_file(&self, path: PathBuf) -> Result<()> {
        debug!(path = %path.display(), "task created");
        let ticket = self.pending.enter();
        let index = Arc::clone(&self.index);
        self.queue.execute(move || {
            let _ticket = ticket;
            let private = InvertedIndex::new();
            match index_file(&path, &private) {
                Ok(words) => {
                    index.add_all(private);
                    debug!(path = %path.display(), words, "task finished");
                }
                Err(e) => warn!(error = %e, "skipping file"),
            }
        })
    }

    pub fn add_files<I>(&self, files: I) -> Result<()>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for file in files {
            self.add_file(file)?;
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    /// Blocks until every scheduled file has been merged.
    pub fn finish(&self) {
        self.pending.wait_idle();
    }

    /// Waits for outstanding work, then stops the worker threads.
    pub fn shutdown(&self) {
        debug!("shutting down index builder");
        self.finish();
        self.queue.shutdown();
        self.queue.join();
        info!(words = self.index.len(), "index build complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn positions_continue_across_lines() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "The cat\nthe_dog, THE end").unwrap();

        let index = InvertedIndex::new();
        assert_eq!(index_file(&file, &index).unwrap(), 6);
        let path = document_path(&file);
        assert_eq!(index.positions("the", &path), Some(vec![1, 3, 5]));
        assert_eq!(index.positions("end", &path), Some(vec![6]));
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "alpha beta").unwrap();
        let files = vec![dir.path().join("missing.txt"), good];

        let index = InvertedIndex::new();
        assert_eq!(build_index(&files, &index), 1);
        assert_eq!(index.words(), vec!["alpha", "beta"]);
    }

    #[test]
    fn multithreaded_matches_sequential() {
        let dir = tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..20 {
            let file = dir.path().join(format!("f{i}.txt"));
            fs::write(&file, format!("shared word{i} shared\nline two {i}")).unwrap();
            files.push(file);
        }

        let sequential = InvertedIndex::new();
        build_index(&files, &sequential);

        let shared = Arc::new(InvertedIndex::new());
        let builder = MultithreadedIndexBuilder::new(Arc::clone(&shared), 4);
        builder.add_files(files.clone()).unwrap();
        builder.shutdown();
        assert_eq!(builder.pending(), 0);

        assert_eq!(shared.words(), sequential.words());
        for file in &files {
            let path = document_path(file);
            assert_eq!(shared.positions("shared", &path), Some(vec![1, 3]));
            assert_eq!(
                shared.positions("shared", &path),
                sequential.positions("shared", &path)
            );
        }
    }

    #[test]
    fn finish_with_nothing_scheduled_returns() {
        let builder = MultithreadedIndexBuilder::new(Arc::new(InvertedIndex::new()), 2);
        builder.finish();
        builder.shutdown();
        assert!(builder.index().is_empty());
    }

    #[test]
    fn add_after_shutdown_fails() {
        let builder = MultithreadedIndexBuilder::new(Arc::new(InvertedIndex::new()), 1);
        builder.shutdown();
        assert!(matches!(
            builder.add_file(PathBuf::from("x.txt")),
            Err(Error::QueueClosed)
        ));
        assert_eq!(builder.pending(), 0);
    }
}
