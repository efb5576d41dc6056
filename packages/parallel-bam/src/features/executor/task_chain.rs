//! Per-executor serial task queue
//!
//! Work items are processed strictly in submission order and never two at a
//! time. At most one pool job holds the "lease" on a chain; it processes one
//! item and either hands the lease to a follow-up job or releases it.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct ChainState<T> {
    pending: VecDeque<T>,
    running: bool,
}

pub struct TaskChain<T> {
    state: Mutex<ChainState<T>>,
    idle: Condvar,
}

impl<T> Default for TaskChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskChain<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                pending: VecDeque::new(),
                running: false,
            }),
            idle: Condvar::new(),
        }
    }

    /// Enqueue an item. Returns true when the caller acquired the lease and
    /// must start a job that drains the chain.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        state.pending.push_back(item);
        if state.running {
            false
        } else {
            state.running = true;
            true
        }
    }

    /// Next item for the lease holder
    pub fn next(&self) -> Option<T> {
        self.state.lock().pending.pop_front()
    }

    /// Called by the lease holder after one item. Returns true if more items
    /// are pending and the lease stays taken; otherwise releases it.
    pub fn release_or_continue(&self) -> bool {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            state.running = false;
            self.idle.notify_all();
            false
        } else {
            true
        }
    }

    /// Drop pending items and release the lease; returns how many were dropped
    pub fn abandon(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.running = false;
        self.idle.notify_all();
        dropped
    }

    pub fn is_idle(&self) -> bool {
        !self.state.lock().running
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Block until no lease is held; false on timeout
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            let mut state = self.state.lock();
            while state.running {
                self.idle.wait(&mut state);
            }
            return true;
        };

        let mut state = self.state.lock();
        while state.running {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return !state.running;
            }
        }
        true
    }
}
