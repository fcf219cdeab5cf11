//! Concurrent word-position index with prefix search.
//!
//! The shared [`InvertedIndex`] is filled by an index builder (from text
//! files) or by the web crawler, and read by the query executors. All
//! asynchronous work runs on a [`WorkQueue`]; each component that issues work
//! tracks it with its own [`TaskGroup`] so callers can block until idle.

pub mod builder;
pub mod error;
pub mod files;
pub mod index;
pub mod lock;
pub mod persist;
pub mod query;
pub mod queue;
pub mod task_group;
pub mod tokenizer;

pub use builder::{build_index, index_file, MultithreadedIndexBuilder};
pub use error::{Error, Result};
pub use index::{InvertedIndex, SearchResult};
pub use lock::MultiReaderLock;
pub use query::{MultithreadedQueryParser, QueryParser, QueryResults};
pub use queue::WorkQueue;
pub use task_group::{TaskGroup, Ticket};

/// Worker count used when none (or zero) is configured.
pub const DEFAULT_THREADS: usize = 5;
