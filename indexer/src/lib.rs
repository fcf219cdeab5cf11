//! Driver for building an index from a directory of text files.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use wordhunt_core::files::list_text_files;
use wordhunt_core::persist::{write_outputs, OutputPaths};
use wordhunt_core::{build_index, InvertedIndex, MultithreadedIndexBuilder, QueryResults};

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Directory searched recursively for .txt files
    #[arg(long)]
    pub dir: PathBuf,
    /// Build and query on this many worker threads (5 when given without a
    /// value); without this flag everything runs on the main thread
    #[arg(long, num_args = 0..=1, default_missing_value = "5")]
    pub threads: Option<usize>,
    /// Write the index here (index.txt when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = "index.txt")]
    pub index: Option<PathBuf>,
    /// File with one query per line
    #[arg(long)]
    pub queries: Option<PathBuf>,
    /// Write query results here (results.txt when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = "results.txt")]
    pub results: Option<PathBuf>,
    /// Write results as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub struct BuildOutcome {
    pub index: Arc<InvertedIndex>,
    pub files: usize,
    pub results: Option<QueryResults>,
}

pub fn run_build(args: &BuildArgs) -> Result<BuildOutcome> {
    if args.threads == Some(0) {
        bail!("--threads must be at least 1");
    }
    let files = list_text_files(&args.dir)?;
    tracing::info!(dir = %args.dir.display(), files = files.len(), "found text files");

    let index = Arc::new(InvertedIndex::new());
    match args.threads {
        Some(threads) => {
            let builder = MultithreadedIndexBuilder::new(Arc::clone(&index), threads);
            let scheduled = builder.add_files(files.iter().cloned());
            builder.shutdown();
            scheduled?;
        }
        None => {
            build_index(&files, &index);
        }
    }

    let outputs = OutputPaths {
        index: args.index.clone(),
        queries: args.queries.clone(),
        results: args.results.clone(),
        json: args.json,
    };
    let results = write_outputs(&index, &outputs, args.threads)?;
    Ok(BuildOutcome {
        index,
        files: files.len(),
        results,
    })
}
