//! Per-run scheduler context shared by all executors
//!
//! Holds the worker pool, the live-executor registry and the run-wide
//! signals: first-error slot, terminate flag and the external shutdown
//! handle. Executors reach each other only through registry lookups by
//! [`ExecutorId`].

use super::block_executor::{BlockExecutor, ExecutorId};
use super::metrics::SchedulerMetrics;
use crate::errors::BamError;
use crate::features::cache::CacheEntry;
use crate::features::data_manager::DataManager;
use crate::pipeline::worker_pool::WorkerPool;
use crate::shared::models::{AbstractState, BlockId, Precision};
use crate::shared::ports::AlgorithmFactory;
use crate::shared::shutdown::ShutdownNotifier;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Record of one finalized executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedExecutor {
    pub id: ExecutorId,
    pub block: BlockId,
    pub target_found: bool,
    pub is_root: bool,
}

/// Plain counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerCounters {
    pub executors_created: usize,
    pub executors_finished: usize,
    pub rejected_tasks: usize,
    pub max_concurrent_applies: usize,
}

#[derive(Default)]
struct RunCounters {
    executors_created: AtomicUsize,
    executors_finished: AtomicUsize,
    rejected_tasks: AtomicUsize,
    max_concurrent_applies: AtomicUsize,
}

pub struct SchedulerShared<S: AbstractState, P: Precision> {
    data_manager: Arc<DataManager<S, P>>,
    factory: Arc<dyn AlgorithmFactory<S, P>>,
    pool: WorkerPool,
    registry: DashMap<ExecutorId, Arc<BlockExecutor<S, P>>, FxBuildHasher>,
    /// Serializes recursion checks with dependency-edge registration
    dependency_lock: Mutex<()>,
    error: Mutex<Option<BamError>>,
    terminate: AtomicBool,
    shutdown: ShutdownNotifier,
    root_finished: AtomicBool,
    finished: Mutex<Vec<FinishedExecutor>>,
    metrics: SchedulerMetrics,
    counters: RunCounters,
}

impl<S: AbstractState, P: Precision> SchedulerShared<S, P> {
    pub fn new(
        data_manager: Arc<DataManager<S, P>>,
        factory: Arc<dyn AlgorithmFactory<S, P>>,
        pool: WorkerPool,
        shutdown: ShutdownNotifier,
        metrics: SchedulerMetrics,
    ) -> Self {
        Self {
            data_manager,
            factory,
            pool,
            registry: DashMap::with_hasher(FxBuildHasher),
            dependency_lock: Mutex::new(()),
            error: Mutex::new(None),
            terminate: AtomicBool::new(false),
            shutdown,
            root_finished: AtomicBool::new(false),
            finished: Mutex::new(Vec::new()),
            metrics,
            counters: RunCounters::default(),
        }
    }

    pub fn data_manager(&self) -> &Arc<DataManager<S, P>> {
        &self.data_manager
    }

    pub fn factory(&self) -> &Arc<dyn AlgorithmFactory<S, P>> {
        &self.factory
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn shutdown_notifier(&self) -> &ShutdownNotifier {
        &self.shutdown
    }

    pub fn terminate_flag(&self) -> &AtomicBool {
        &self.terminate
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Signals
    // ═══════════════════════════════════════════════════════════════════════

    pub fn should_terminate(&self) -> bool {
        self.terminate.load(Ordering::Acquire) || self.shutdown.should_shutdown()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.should_shutdown()
    }

    /// Stop the run: terminate flag plus immediate pool shutdown
    pub fn cancel(&self) {
        if !self.terminate.swap(true, Ordering::AcqRel) {
            debug!("cancelling run");
        }
        self.pool.shutdown_now();
    }

    /// Route a failure raised at the task boundary
    ///
    /// Transient scheduling noise is logged and dropped. Anything else is
    /// stored (first failure wins) and cancels the run.
    pub fn record_failure(&self, err: BamError) {
        if err.is_transient() {
            self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
            self.metrics.rejected_tasks.inc();
            if self.should_terminate() || self.root_finished() {
                debug!(error = %err, "dropping continuation after shutdown");
            } else {
                warn!(error = %err, "continuation rejected while run is active");
            }
            return;
        }

        {
            let mut slot = self.error.lock();
            if slot.is_none() {
                error!(category = %err.category(), error = %err, "executor failed, cancelling run");
                *slot = Some(err);
            } else {
                debug!(error = %err, "suppressed follow-up failure");
            }
        }
        self.cancel();
    }

    pub fn take_error(&self) -> Option<BamError> {
        self.error.lock().take()
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().is_some()
    }

    pub fn mark_root_finished(&self) {
        self.root_finished.store(true, Ordering::Release);
    }

    pub fn root_finished(&self) -> bool {
        self.root_finished.load(Ordering::Acquire)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Live registry
    // ═══════════════════════════════════════════════════════════════════════

    pub fn register(&self, executor: Arc<BlockExecutor<S, P>>) {
        self.registry.insert(executor.id(), executor);
        self.on_created();
    }

    /// Held from the recursion check until the new edge is registered
    ///
    /// Two executors that resolve each other's blocks at the same time would
    /// otherwise both pass the check before either edge exists.
    pub fn lock_dependencies(&self) -> MutexGuard<'_, ()> {
        self.dependency_lock.lock()
    }

    /// Executor for the reached set of `entry`, created if none is live
    ///
    /// `None` when the entry already has exit states: its executor finished
    /// and left the registry, the caller reads the summary instead.
    pub fn get_or_create_executor(
        self: &Arc<Self>,
        entry: &Arc<CacheEntry<S, P>>,
    ) -> Option<(Arc<BlockExecutor<S, P>>, bool)> {
        match self.registry.entry(entry.reached().id()) {
            Entry::Occupied(occupied) => Some((Arc::clone(occupied.get()), false)),
            // exit states are stored before the executor unregisters
            Entry::Vacant(_) if entry.is_complete() => None,
            Entry::Vacant(vacant) => {
                let executor = BlockExecutor::for_entry(Arc::clone(self), Arc::clone(entry));
                vacant.insert(Arc::clone(&executor));
                self.on_created();
                debug!(
                    executor = %executor.id(),
                    block = %executor.block().id(),
                    "created block executor"
                );
                Some((executor, true))
            }
        }
    }

    fn on_created(&self) {
        self.counters.executors_created.fetch_add(1, Ordering::Relaxed);
        self.metrics.executors_created.inc();
        self.metrics.active_executors.inc();
    }

    pub fn executor(&self, id: ExecutorId) -> Option<Arc<BlockExecutor<S, P>>> {
        self.registry.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Remove `executor` if it is still the registered instance for its id
    pub fn unregister(&self, executor: &Arc<BlockExecutor<S, P>>, record: FinishedExecutor) {
        if self
            .registry
            .remove_if(&executor.id(), |_, live| Arc::ptr_eq(live, executor))
            .is_some()
        {
            self.metrics.active_executors.dec();
        }
        self.counters.executors_finished.fetch_add(1, Ordering::Relaxed);
        self.metrics.executors_finished.inc();
        self.finished.lock().push(record);
    }

    pub fn live_executors(&self) -> Vec<Arc<BlockExecutor<S, P>>> {
        self.registry.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn finished_executors(&self) -> Vec<FinishedExecutor> {
        self.finished.lock().clone()
    }

    /// Drop all live executors
    ///
    /// Executors hold the context and the registry holds executors; clearing
    /// the registry after a run releases both.
    pub fn dispose(&self) {
        let remaining = self.registry.len();
        self.registry.clear();
        self.metrics.active_executors.sub(remaining as i64);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statistics
    // ═══════════════════════════════════════════════════════════════════════

    pub fn observe_concurrent_applies(&self, current: usize) {
        self.counters
            .max_concurrent_applies
            .fetch_max(current, Ordering::Relaxed);
    }

    pub fn counters(&self) -> SchedulerCounters {
        SchedulerCounters {
            executors_created: self.counters.executors_created.load(Ordering::Relaxed),
            executors_finished: self.counters.executors_finished.load(Ordering::Relaxed),
            rejected_tasks: self.counters.rejected_tasks.load(Ordering::Relaxed),
            max_concurrent_applies: self
                .counters
                .max_concurrent_applies
                .load(Ordering::Relaxed),
        }
    }
}
