//! Multiple-reader / single-writer lock.
//!
//! Any number of readers may hold the lock at once, or exactly one writer.
//! Arriving readers queue behind a waiting writer, so a writer is granted the
//! lock as soon as the readers already inside have left.
//!
//! The lock is not reentrant: a thread holding a read guard must drop it
//! before asking for a write guard on the same lock, otherwise it deadlocks.

use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writer: bool,
    waiting_writers: usize,
}

pub struct MultiReaderLock<T> {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `state`: shared references only
// exist while `readers > 0 && !writer`, the unique reference only while
// `writer && readers == 0`.
unsafe impl<T: Send> Send for MultiReaderLock<T> {}
unsafe impl<T: Send + Sync> Sync for MultiReaderLock<T> {}

impl<T> MultiReaderLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(State::default()),
            readable: Condvar::new(),
            writable: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires shared access, waiting while a writer holds or awaits the lock.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        while state.writer || state.waiting_writers > 0 {
            self.readable.wait(&mut state);
        }
        state.readers += 1;
        ReadGuard { lock: self }
    }

    /// Acquires exclusive access, waiting for the current readers and writer.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        state.waiting_writers += 1;
        while state.writer || state.readers > 0 {
            self.writable.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.writer = true;
        WriteGuard { lock: self }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn unlock_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0, "read unlock without a read lock");
        debug_assert!(!state.writer, "read unlock while a writer holds the lock");
        state.readers -= 1;
        if state.readers == 0 {
            self.writable.notify_one();
        }
    }

    fn unlock_write(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.writer, "write unlock without a write lock");
        state.writer = false;
        if state.waiting_writers > 0 {
            self.writable.notify_one();
        } else {
            self.readable.notify_all();
        }
    }
}

impl<T: Default> Default for MultiReaderLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for MultiReaderLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MultiReaderLock")
            .field("readers", &state.readers)
            .field("writer", &state.writer)
            .field("waiting_writers", &state.waiting_writers)
            .finish_non_exhaustive()
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, T> {
    lock: &'a MultiReaderLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a read guard exists, so no writer holds the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a, T> {
    lock: &'a MultiReaderLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this guard is the only holder of the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this guard is the only holder of the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}
