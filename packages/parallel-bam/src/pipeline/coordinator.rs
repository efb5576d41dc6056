//! Parallel BAM coordinator
//!
//! Entry point of the engine. One `run` analyses one main reached set:
//!
//! 1. reset data left behind by the previous run
//! 2. build the worker pool and the per-run scheduler context
//! 3. submit the root executor and wait for the pool to go quiet
//! 4. collect the single propagated error, or the status
//!
//! The data manager outlives runs, so summaries computed by one run are
//! reused by the next.

use crate::config::BamConfig;
use crate::errors::{BamError, BamResult, InternalError};
use crate::features::data_manager::DataManager;
use crate::features::executor::{BlockExecutor, SchedulerMetrics, SchedulerShared};
use crate::pipeline::status::{BamStatus, RunStatistics};
use crate::pipeline::worker_pool::WorkerPool;
use crate::shared::models::{AbstractState, BlockPartition, Precision, ReachedSetRef};
use crate::shared::ports::AlgorithmFactory;
use crate::shared::shutdown::ShutdownNotifier;
use parking_lot::Mutex;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ParallelBamAlgorithm<S: AbstractState, P: Precision> {
    config: BamConfig,
    partition: Arc<BlockPartition>,
    data_manager: Arc<DataManager<S, P>>,
    factory: Arc<dyn AlgorithmFactory<S, P>>,
    shutdown: ShutdownNotifier,
    metrics: SchedulerMetrics,
    /// Runs are sequential
    run_lock: Mutex<()>,
}

impl<S: AbstractState, P: Precision> ParallelBamAlgorithm<S, P> {
    pub fn new(
        config: BamConfig,
        partition: Arc<BlockPartition>,
        data_manager: Arc<DataManager<S, P>>,
        factory: Arc<dyn AlgorithmFactory<S, P>>,
        registry: &Registry,
    ) -> BamResult<Self> {
        config.validate()?;
        for &location in &config.uncached_block_entries {
            data_manager.add_uncached_block_entry(location);
        }

        Ok(Self {
            config,
            partition,
            data_manager,
            factory,
            shutdown: ShutdownNotifier::new(),
            metrics: SchedulerMetrics::new(registry)?,
            run_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BamConfig {
        &self.config
    }

    pub fn partition(&self) -> &Arc<BlockPartition> {
        &self.partition
    }

    pub fn data_manager(&self) -> &Arc<DataManager<S, P>> {
        &self.data_manager
    }

    /// Handle for aborting runs from outside; the request is sticky
    pub fn shutdown_handle(&self) -> ShutdownNotifier {
        self.shutdown.clone()
    }

    /// Analyse `main_reached` to completion, timeout or abort
    ///
    /// A timeout or an external abort is not an error: the status comes back
    /// with `sound == false`. Worker failures are returned as
    /// [`BamError::Worker`] wrapping the first failure.
    pub fn run(&self, main_reached: &ReachedSetRef<S, P>) -> BamResult<BamStatus> {
        let _run = self.run_lock.lock();
        let started = Instant::now();

        let dropped_entries = self.data_manager.prepare_for_run();
        let cache_before = self.data_manager.cache().counts();

        let pool = WorkerPool::from_config(&self.config)?;
        let workers = pool.num_threads();
        let shared = Arc::new(SchedulerShared::new(
            Arc::clone(&self.data_manager),
            Arc::clone(&self.factory),
            pool,
            self.shutdown.clone(),
            self.metrics.clone(),
        ));

        let root = BlockExecutor::for_main(
            Arc::clone(&shared),
            Arc::clone(self.partition.main_block()),
            main_reached.clone(),
        );
        shared.register(Arc::clone(&root));

        info!(
            workers,
            main_block = %self.partition.main_block().id(),
            reached_set = %main_reached.id(),
            cached_summaries = self.data_manager.cache().len(),
            "starting parallel block analysis"
        );
        root.schedule_run(Vec::new());

        let mut sound = true;
        if !shared.pool().await_termination(self.config.timeout_duration()) {
            warn!(
                timeout_ms = self.config.timeout_ms,
                live_executors = shared.live_executors().len(),
                "parallel block analysis timed out, result is unsound"
            );
            shared.cancel();
            sound = false;
        }

        let grace = self.config.settle_grace_duration();
        for executor in shared.live_executors() {
            if shared.pool().outstanding() == 0 {
                // leases left after the pool drained belong to skipped jobs
                let dropped = executor.release_stale_lease();
                if dropped > 0 {
                    debug!(executor = %executor.id(), dropped, "dropped skipped continuations");
                }
            } else if !executor.wait_settled(grace) {
                debug!(executor = %executor.id(), "executor still running after grace period");
            }
        }

        let error = shared.take_error();
        let interrupted = self.shutdown.should_shutdown();
        let root_finished = shared.root_finished();
        let target_found = root.target_found();
        let finished = shared.finished_executors();

        let counters = shared.counters();
        let statistics = RunStatistics {
            workers,
            executors_created: counters.executors_created,
            executors_finished: counters.executors_finished,
            max_concurrent_applies: counters.max_concurrent_applies,
            rejected_tasks: counters.rejected_tasks,
            pool_jobs: shared.pool().submitted(),
            skipped_jobs: shared.pool().skipped(),
            cache: self.data_manager.cache().counts().since(&cache_before),
            dropped_entries,
            cache_entries: self.data_manager.cache().len(),
            elapsed: started.elapsed(),
        };
        shared.dispose();
        drop(root);

        if let Some(err) = error {
            self.data_manager.mark_tainted();
            return Err(BamError::Worker(Box::new(err)));
        }

        if !sound || interrupted {
            self.data_manager.mark_tainted();
            let reason = self
                .shutdown
                .reason()
                .unwrap_or_else(|| "timeout".to_string());
            info!(
                interrupted,
                reason = %reason,
                elapsed_ms = statistics.elapsed.as_millis() as u64,
                "parallel block analysis stopped early"
            );
            return Ok(BamStatus {
                sound: false,
                target_found,
                interrupted,
                statistics,
            });
        }

        if !root_finished {
            self.data_manager.mark_tainted();
            return Err(InternalError::RootNotFinished.into());
        }

        if !target_found {
            if let Some(child) = finished.iter().find(|f| !f.is_root && f.target_found) {
                self.data_manager.mark_tainted();
                return Err(InternalError::TargetAsymmetry { block: child.block }.into());
            }
        }

        info!(
            target_found,
            executors = statistics.executors_created,
            full_hits = statistics.cache.full_hits,
            misses = statistics.cache.misses,
            elapsed_ms = statistics.elapsed.as_millis() as u64,
            "parallel block analysis finished"
        );

        Ok(BamStatus {
            sound: true,
            target_found,
            interrupted: false,
            statistics,
        })
    }
}
