//! Pending-work accounting shared by every component that schedules tasks.
//!
//! A [`Ticket`] is taken before a task is handed to the [`WorkQueue`] and is
//! released when the task's closure is dropped, whether it ran to completion,
//! panicked, or was rejected by a closed queue. [`TaskGroup::wait_idle`] blocks
//! until every outstanding ticket has been released.
//!
//! [`WorkQueue`]: crate::WorkQueue

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TaskGroup {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl TaskGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one unit of outstanding work.
    pub fn enter(self: &Arc<Self>) -> Ticket {
        let mut pending = self.pending.lock();
        *pending += 1;
        debug!(pending = *pending, "pending work increased");
        Ticket {
            group: Arc::clone(self),
        }
    }

    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Blocks until no work is outstanding. Returns immediately when idle.
    pub fn wait_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            debug!(pending = *pending, "waiting until finished");
            self.idle.wait(&mut pending);
        }
    }

    fn leave(&self) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending > 0, "ticket released on an idle task group");
        *pending = pending.saturating_sub(1);
        debug!(pending = *pending, "pending work decreased");
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// One unit of outstanding work; released on drop.
#[derive(Debug)]
#[must_use = "dropping a ticket immediately marks its work as finished"]
pub struct Ticket {
    group: Arc<TaskGroup>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.group.leave();
    }
}
