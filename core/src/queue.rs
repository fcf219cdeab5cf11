//! Fixed-size worker pool over an unbounded FIFO task queue.
//!
//! The queue does not track how many tasks are outstanding; callers layer a
//! [`TaskGroup`](crate::TaskGroup) on top when they need an idle barrier.

use crate::error::{Error, Result};
use crate::DEFAULT_THREADS;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Backlog {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    backlog: Mutex<Backlog>,
    available: Condvar,
}

pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkQueue {
    /// Starts `threads` workers. Zero falls back to [`DEFAULT_THREADS`].
    pub fn new(threads: usize) -> Self {
        Self::with_name(threads, "wordhunt-worker")
    }

    /// Like [`WorkQueue::new`], naming workers `{name}-0`, `{name}-1`, ...
    pub fn with_name(threads: usize, name: &str) -> Self {
        let size = if threads == 0 {
            warn!(default = DEFAULT_THREADS, "zero worker threads requested, using default");
            DEFAULT_THREADS
        } else {
            threads
        };

        let shared = Arc::new(Shared::default());
        let workers = (0..size)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("{name}-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn work queue thread")
            })
            .collect();

        Self {
            shared,
            workers: Mutex::new(workers),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Enqueues a task. Fails once [`WorkQueue::shutdown`] has been called;
    /// the rejected task is dropped without running.
    pub fn execute<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut backlog = self.shared.backlog.lock();
            if backlog.shutdown {
                return Err(Error::QueueClosed);
            }
            backlog.tasks.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Tells workers to exit once the backlog is drained. Running tasks are
    /// not interrupted and this call does not wait for them. Idempotent.
    pub fn shutdown(&self) {
        let mut backlog = self.shared.backlog.lock();
        if !backlog.shutdown {
            debug!(queued = backlog.tasks.len(), "shutting down work queue");
            backlog.shutdown = true;
        }
        self.shared.available.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.backlog.lock().shutdown
    }

    /// Waits for workers to exit. Only returns after [`WorkQueue::shutdown`]
    /// and a drained backlog. A worker calling this skips joining itself.
    pub fn join(&self) {
        let current = thread::current().id();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("work queue thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut backlog = shared.backlog.lock();
            loop {
                if let Some(task) = backlog.tasks.pop_front() {
                    break task;
                }
                if backlog.shutdown {
                    return;
                }
                shared.available.wait(&mut backlog);
            }
        };

        if let Err(e) = panic::catch_unwind(AssertUnwindSafe(task)) {
            let reason = e
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| e.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("(non-string panic)");
            error!(reason, "work queue task panicked");
        }
    }
}
