//! Fixed-size worker pool
//!
//! Thin layer over a `rayon::ThreadPool` that adds what the scheduler needs
//! and rayon does not offer directly:
//! - outstanding-job accounting with `await_termination(timeout)`
//! - orderly `shutdown()` (new submissions rejected, queued jobs still run)
//! - immediate `shutdown_now()` (queued jobs skip their body)
//!
//! The pool counts as terminated once shut down with no outstanding jobs,
//! or, for `await_termination`, as soon as the outstanding count drops to
//! zero: the scheduler only goes quiet when every executor is finished or
//! waiting, so an empty pool is the termination signal.

use crate::config::BamConfig;
use crate::errors::{BamError, BamResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

struct PoolState {
    outstanding: Mutex<usize>,
    drained: Condvar,
    shutdown: AtomicBool,
    cancelled: AtomicBool,
    submitted: AtomicU64,
    skipped: AtomicU64,
}

/// Decrements the outstanding count when the job ends, panicking or not
struct CompletionGuard(Arc<PoolState>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut outstanding = self.0.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.0.drained.notify_all();
        }
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    state: Arc<PoolState>,
    num_threads: usize,
}

impl WorkerPool {
    pub fn new(num_threads: usize, stack_size_mb: usize, name_prefix: &str) -> BamResult<Self> {
        let prefix = name_prefix.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .stack_size(stack_size_mb * 1024 * 1024)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(|_| error!("worker job panicked outside executor boundary"))
            .build()
            .map_err(|e| BamError::ThreadPool(e.to_string()))?;

        Ok(Self {
            pool,
            state: Arc::new(PoolState {
                outstanding: Mutex::new(0),
                drained: Condvar::new(),
                shutdown: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                submitted: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
            num_threads,
        })
    }

    pub fn from_config(config: &BamConfig) -> BamResult<Self> {
        Self::new(
            config.effective_workers(),
            config.stack_size_mb,
            &config.thread_name_prefix,
        )
    }

    /// Queue a job; fails with [`BamError::TaskRejected`] after shutdown
    pub fn submit<F>(&self, job: F) -> BamResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut outstanding = self.state.outstanding.lock();
            if self.state.shutdown.load(Ordering::Acquire) {
                return Err(BamError::TaskRejected);
            }
            *outstanding += 1;
        }
        self.state.submitted.fetch_add(1, Ordering::Relaxed);

        let state = Arc::clone(&self.state);
        self.pool.spawn(move || {
            let guard = CompletionGuard(state);
            if guard.0.cancelled.load(Ordering::Acquire) {
                guard.0.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            job();
        });
        Ok(())
    }

    /// Reject new submissions; queued jobs still run
    pub fn shutdown(&self) {
        let _outstanding = self.state.outstanding.lock();
        self.state.shutdown.store(true, Ordering::Release);
    }

    /// Reject new submissions and skip queued jobs
    pub fn shutdown_now(&self) {
        let _outstanding = self.state.outstanding.lock();
        self.state.cancelled.store(true, Ordering::Release);
        self.state.shutdown.store(true, Ordering::Release);
        debug!("worker pool shut down immediately");
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.shutdown.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Wait until no job is queued or running; false on timeout
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut outstanding = self.state.outstanding.lock();

        while *outstanding > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .state
                        .drained
                        .wait_until(&mut outstanding, deadline)
                        .timed_out()
                    {
                        return *outstanding == 0;
                    }
                }
                None => self.state.drained.wait(&mut outstanding),
            }
        }
        true
    }

    pub fn outstanding(&self) -> usize {
        *self.state.outstanding.lock()
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn submitted(&self) -> u64 {
        self.state.submitted.load(Ordering::Relaxed)
    }

    /// Jobs dropped by `shutdown_now` before their body ran
    pub fn skipped(&self) -> u64 {
        self.state.skipped.load(Ordering::Relaxed)
    }
}
