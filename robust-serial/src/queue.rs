//! Thread-safe work queue with bulk discard.
//!
//! [`ClearableQueue`] is a FIFO shared between producer and consumer threads.
//! It tracks unfinished work the same way a task queue does: each `put` adds
//! a task, each `task_done` completes one, and `join` waits for the count to
//! reach zero. [`ClearableQueue::clear`] drops everything still queued and
//! adjusts that count in the same critical section, so `join` waiters and
//! blocked producers see a consistent state.
//!
//! ## Example
//!
//! ```rust
//! use robust_serial::ClearableQueue;
//!
//! let queue = ClearableQueue::bounded(4);
//! queue.put(b"ping".to_vec());
//! queue.put(b"pong".to_vec());
//!
//! let first = queue.get();
//! queue.task_done().unwrap();
//! assert_eq!(first, b"ping");
//!
//! assert_eq!(queue.clear().unwrap(), 1);
//! queue.join();
//! ```

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{Error, Result};

struct State<T> {
    items: VecDeque<T>,
    unfinished: usize,
}

/// FIFO queue with task accounting and an atomic `clear`.
pub struct ClearableQueue<T> {
    state: Mutex<State<T>>,
    capacity: Option<usize>,
    not_empty: Condvar,
    not_full: Condvar,
    all_tasks_done: Condvar,
}

impl<T> Default for ClearableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClearableQueue<T> {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` items. Zero means unbounded.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity((capacity > 0).then_some(capacity))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            all_tasks_done: Condvar::new(),
        }
    }

    /// Maximum number of queued items, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no items are queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Whether a `put` would block.
    pub fn is_full(&self) -> bool {
        self.full(&self.state.lock())
    }

    /// Items put but not yet marked done.
    pub fn unfinished_tasks(&self) -> usize {
        self.state.lock().unfinished
    }

    /// Append an item, waiting for space if the queue is full.
    pub fn put(&self, item: T) {
        let mut state = self.state.lock();
        while self.full(&state) {
            self.not_full.wait(&mut state);
        }
        self.push(&mut state, item);
    }

    /// Append an item if there is space, otherwise hand it back.
    pub fn try_put(&self, item: T) -> std::result::Result<(), T> {
        let mut state = self.state.lock();
        if self.full(&state) {
            return Err(item);
        }
        self.push(&mut state, item);
        Ok(())
    }

    /// Append an item, waiting at most `timeout` for space.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> std::result::Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while self.full(&state) {
            if self
                .not_full
                .wait_until(&mut state, deadline)
                .timed_out()
                && self.full(&state)
            {
                return Err(item);
            }
        }
        self.push(&mut state, item);
        Ok(())
    }

    /// Remove and return the oldest item, waiting until one is available.
    pub fn get(&self) -> T {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = self.pop(&mut state) {
                return item;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Remove and return the oldest item if there is one.
    pub fn try_get(&self) -> Option<T> {
        let mut state = self.state.lock();
        self.pop(&mut state)
    }

    /// Remove and return the oldest item, waiting at most `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(item) = self.pop(&mut state) {
                return Some(item);
            }
            if self
                .not_empty
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return self.pop(&mut state);
            }
        }
    }

    /// Mark one previously retrieved item as processed.
    pub fn task_done(&self) -> Result<()> {
        let mut state = self.state.lock();
        let unfinished = state
            .unfinished
            .checked_sub(1)
            .ok_or(Error::TaskDoneOverflow)?;
        state.unfinished = unfinished;
        if unfinished == 0 {
            self.all_tasks_done.notify_all();
        }
        Ok(())
    }

    /// Wait until every item put has been marked done.
    pub fn join(&self) {
        let mut state = self.state.lock();
        while state.unfinished > 0 {
            self.all_tasks_done.wait(&mut state);
        }
    }

    /// Discard every queued item. Returns how many were dropped.
    ///
    /// Discarded items count as finished. Items already taken by a consumer
    /// still need their `task_done`.
    pub fn clear(&self) -> Result<usize> {
        let discarded = {
            let mut state = self.state.lock();
            let unfinished = state
                .unfinished
                .checked_sub(state.items.len())
                .ok_or(Error::TaskDoneOverflow)?;
            if unfinished == 0 {
                self.all_tasks_done.notify_all();
            }
            state.unfinished = unfinished;
            let discarded = std::mem::take(&mut state.items);
            self.not_full.notify_all();
            discarded
        };
        Ok(discarded.len())
    }

    fn full(&self, state: &MutexGuard<'_, State<T>>) -> bool {
        self.capacity
            .is_some_and(|cap| state.items.len() >= cap)
    }

    fn push(&self, state: &mut MutexGuard<'_, State<T>>, item: T) {
        state.items.push_back(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    fn pop(&self, state: &mut MutexGuard<'_, State<T>>) -> Option<T> {
        let item = state.items.pop_front()?;
        self.not_full.notify_one();
        Some(item)
    }
}
