//! Bounded web crawler that feeds fetched pages into a shared
//! [`InvertedIndex`].
//!
//! Starting from a seed URL, each task fetches one page, schedules the pages
//! it links to, and indexes the page's words. Links are resolved against the
//! seed URL for the whole session, not against the page they appear on. The
//! visited set caps the total number of pages scheduled.

pub mod error;
pub mod fetch;
pub mod html;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use wordhunt_core::{InvertedIndex, MultiReaderLock, TaskGroup, WorkQueue, DEFAULT_THREADS};

pub use error::{CrawlError, FetchError};

pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Worker threads fetching pages.
    pub threads: usize,
    /// Most URLs scheduled in one session, seed included.
    pub max_pages: usize,
    /// Bound on connecting and on each socket read or write.
    pub timeout: Option<Duration>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

struct Shared {
    index: Arc<InvertedIndex>,
    visited: MultiReaderLock<HashSet<String>>,
    queue: WorkQueue,
    pending: Arc<TaskGroup>,
    failures: AtomicUsize,
    config: CrawlConfig,
}

pub struct WebCrawler {
    shared: Arc<Shared>,
}

impl WebCrawler {
    pub fn new(index: Arc<InvertedIndex>, config: CrawlConfig) -> Self {
        let queue = WorkQueue::with_name(config.threads, "crawler");
        Self {
            shared: Arc::new(Shared {
                index,
                visited: MultiReaderLock::default(),
                queue,
                pending: TaskGroup::new(),
                failures: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// Marks `seed` visited and schedules its fetch. Does nothing if the seed
    /// was already visited or the cap is reached.
    pub fn crawl(&self, seed: &str) -> Result<(), CrawlError> {
        let seed_url = Url::parse(seed).map_err(|source| CrawlError::InvalidSeed {
            url: seed.to_string(),
            source,
        })?;
        if seed_url.scheme() != "http" {
            return Err(CrawlError::UnsupportedScheme(seed_url.scheme().to_string()));
        }

        let mut visited = self.shared.visited.write();
        if visited.len() >= self.shared.config.max_pages {
            warn!(seed, "visited cap reached, seed not scheduled");
            return Ok(());
        }
        let key = norm(&seed_url);
        if visited.insert(key.clone()) {
            info!(seed = %key, max_pages = self.shared.config.max_pages, "crawl started");
            schedule(&self.shared, key, seed_url)?;
        }
        Ok(())
    }

    /// Canonical URLs scheduled so far, sorted.
    pub fn visited(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.shared.visited.read().iter().cloned().collect();
        urls.sort();
        urls
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.shared.index
    }

    /// Pages whose fetch or URL resolution failed.
    pub fn failures(&self) -> usize {
        self.shared.failures.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.shared.pending.pending()
    }

    /// Blocks until every scheduled page, including pages scheduled by other
    /// pages, has been processed.
    pub fn finish(&self) {
        self.shared.pending.wait_idle();
    }

    pub fn shutdown(&self) {
        debug!("shutting down crawler");
        self.finish();
        self.shared.queue.shutdown();
        self.shared.queue.join();
        info!(
            visited = self.shared.visited.read().len(),
            failures = self.failures(),
            words = self.shared.index.len(),
            "crawl complete"
        );
    }
}

/// URL with its fragment removed; identifies a page in the visited set and
/// in the index.
pub fn norm(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

fn schedule(shared: &Arc<Shared>, link: String, base: Url) -> Result<(), CrawlError> {
    debug!(%link, "task created");
    let ticket = shared.pending.enter();
    let task_shared = Arc::clone(shared);
    shared.queue.execute(move || {
        let _ticket = ticket;
        if let Err(e) = crawl_page(&task_shared, &link, &base) {
            task_shared.failures.fetch_add(1, Ordering::Relaxed);
            warn!(%link, error = %e, "page skipped");
        }
        debug!(%link, "task finished");
    })?;
    Ok(())
}

fn crawl_page(shared: &Arc<Shared>, link: &str, base: &Url) -> Result<(), FetchError> {
    let url = base.join(link)?;
    let html = fetch::fetch_html(&url, shared.config.timeout)?;

    let links = html::extract_links(&html);
    {
        let mut visited = shared.visited.write();
        for found in &links {
            if visited.len() >= shared.config.max_pages {
                debug!(%url, "visited cap reached");
                break;
            }
            let resolved = match base.join(found) {
                Ok(resolved) => resolved,
                Err(e) => {
                    debug!(link = %found, error = %e, "unresolvable link ignored");
                    continue;
                }
            };
            if resolved.scheme() != "http" {
                continue;
            }
            let key = norm(&resolved);
            if visited.insert(key.clone()) {
                if let Err(e) = schedule(shared, key, base.clone()) {
                    warn!(error = %e, "could not schedule link");
                }
            }
        }
    }

    let words = html::extract_words(&html);
    let page = InvertedIndex::new();
    page.add_words(&words, &norm(&url));
    shared.index.add_all(page);
    debug!(%url, links = links.len(), words = words.len(), "page indexed");
    Ok(())
}
