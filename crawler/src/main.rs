use anyhow::{bail, Result};
use clap::Parser;
use crawler::{CrawlConfig, WebCrawler, DEFAULT_MAX_PAGES};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use wordhunt_core::persist::{write_outputs, OutputPaths};
use wordhunt_core::{InvertedIndex, DEFAULT_THREADS};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl from a seed URL into a word index, then answer queries")]
struct Cli {
    /// Seed URL (http only)
    #[arg(long)]
    seed: String,
    /// Worker threads for crawling and querying
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,
    /// Maximum number of pages to schedule, seed included
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,
    /// Socket timeout seconds (0 disables the timeout)
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Write the index here (index.txt when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = "index.txt")]
    index: Option<PathBuf>,
    /// File with one query per line
    #[arg(long)]
    queries: Option<PathBuf>,
    /// Write query results here (results.txt when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = "results.txt")]
    results: Option<PathBuf>,
    /// Write results as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }

    let config = CrawlConfig {
        threads: args.threads,
        max_pages: args.max_pages,
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
    };
    let index = Arc::new(InvertedIndex::new());
    let crawler = WebCrawler::new(Arc::clone(&index), config);
    let started = crawler.crawl(&args.seed);
    crawler.shutdown();
    started?;

    tracing::info!(
        pages = crawler.visited().len(),
        failures = crawler.failures(),
        "crawl finished"
    );

    let outputs = OutputPaths {
        index: args.index,
        queries: args.queries,
        results: args.results,
        json: args.json,
    };
    write_outputs(&index, &outputs, Some(args.threads))?;
    Ok(())
}
