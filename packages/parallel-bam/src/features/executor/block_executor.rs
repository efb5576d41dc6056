//! Block executor
//!
//! Owns one reached set and drives the single-block algorithm over it. All
//! work for an executor goes through [`BlockExecutor::schedule_run`], which
//! appends to the executor's task chain; continuations therefore run in
//! submission order and never overlap.
//!
//! Lifecycle: idle -> running -> (waiting on children | finished). A
//! finished executor stores its exit states in the cache, wakes every parent
//! waiting on it and leaves the live registry.

use super::recursion::check_for_recursion;
use super::scheduler::{FinishedExecutor, SchedulerShared};
use super::task_chain::TaskChain;
use crate::errors::{BamResult, InternalError};
use crate::features::cache::CacheEntry;
use crate::shared::models::{
    AbstractState, Block, Precision, ReachedSet, ReachedSetId, ReachedSetRef,
};
use crate::shared::ports::{AlgorithmContext, AlgorithmOutcome, BlockAlgorithm, MissingBlock};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Executors are identified by the reached set they own
pub type ExecutorId = ReachedSetId;

struct WorkState<S: AbstractState, P: Precision> {
    algorithm: Box<dyn BlockAlgorithm<S, P>>,
    /// Own states waiting for a child summary
    depends_on: FxHashSet<S>,
    finalized: bool,
}

struct DependencyLinks<S> {
    /// Parent executors and the parent state waiting on this executor
    parents: Vec<(ExecutorId, S)>,
    finished: bool,
}

pub struct BlockExecutor<S: AbstractState, P: Precision> {
    id: ExecutorId,
    block: Arc<Block>,
    reached: ReachedSetRef<S, P>,
    /// `None` for the main reached set
    cache_entry: Option<Arc<CacheEntry<S, P>>>,
    shared: Arc<SchedulerShared<S, P>>,
    work: Mutex<WorkState<S, P>>,
    links: Mutex<DependencyLinks<S>>,
    chain: TaskChain<Vec<S>>,
    target_found: AtomicBool,
    active_applies: AtomicUsize,
    max_concurrent_applies: AtomicUsize,
    applies: AtomicU64,
    created_at: Instant,
}

/// Tracks overlapping `apply` calls on one executor
struct ApplyGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ApplyGuard<'a> {
    fn enter(active: &'a AtomicUsize) -> (Self, usize) {
        let now = active.fetch_add(1, Ordering::AcqRel) + 1;
        (Self { active }, now)
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: AbstractState, P: Precision> BlockExecutor<S, P> {
    fn new(
        shared: Arc<SchedulerShared<S, P>>,
        block: Arc<Block>,
        reached: ReachedSetRef<S, P>,
        cache_entry: Option<Arc<CacheEntry<S, P>>>,
    ) -> Arc<Self> {
        let algorithm = shared.factory().create(&block);
        Arc::new(Self {
            id: reached.id(),
            block,
            reached,
            cache_entry,
            shared,
            work: Mutex::new(WorkState {
                algorithm,
                depends_on: FxHashSet::default(),
                finalized: false,
            }),
            links: Mutex::new(DependencyLinks {
                parents: Vec::new(),
                finished: false,
            }),
            chain: TaskChain::new(),
            target_found: AtomicBool::new(false),
            active_applies: AtomicUsize::new(0),
            max_concurrent_applies: AtomicUsize::new(0),
            applies: AtomicU64::new(0),
            created_at: Instant::now(),
        })
    }

    /// Executor for the main reached set (no cache entry)
    pub fn for_main(
        shared: Arc<SchedulerShared<S, P>>,
        block: Arc<Block>,
        reached: ReachedSetRef<S, P>,
    ) -> Arc<Self> {
        Self::new(shared, block, reached, None)
    }

    /// Executor for the reached set of a cache entry
    pub fn for_entry(shared: Arc<SchedulerShared<S, P>>, entry: Arc<CacheEntry<S, P>>) -> Arc<Self> {
        let block = Arc::clone(entry.key().block());
        let reached = entry.reached().clone();
        Self::new(shared, block, reached, Some(entry))
    }

    pub fn id(&self) -> ExecutorId {
        self.id
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn reached(&self) -> &ReachedSetRef<S, P> {
        &self.reached
    }

    pub fn is_root(&self) -> bool {
        self.cache_entry.is_none()
    }

    pub fn target_found(&self) -> bool {
        self.target_found.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.links.lock().finished
    }

    /// Highest number of overlapping `apply` calls observed (1 when healthy)
    pub fn max_concurrent_applies(&self) -> usize {
        self.max_concurrent_applies.load(Ordering::Relaxed)
    }

    pub fn applies(&self) -> u64 {
        self.applies.load(Ordering::Relaxed)
    }

    /// Executors currently waiting on this one
    pub fn parent_ids(&self) -> Vec<ExecutorId> {
        self.links.lock().parents.iter().map(|(id, _)| *id).collect()
    }

    /// Register `parent_state` of `parent` as waiting on this executor
    ///
    /// Returns false when this executor already finished; the caller then
    /// reads the summary from the cache instead.
    pub fn add_depending_from(&self, parent: ExecutorId, parent_state: S) -> bool {
        let mut links = self.links.lock();
        if links.finished {
            return false;
        }
        links.parents.push((parent, parent_state));
        true
    }

    /// Wait until no continuation of this executor is running
    pub fn wait_settled(&self, timeout: std::time::Duration) -> bool {
        self.chain.wait_idle(timeout)
    }

    /// Free a chain whose lease belongs to a job the pool skipped
    ///
    /// Only valid once no pool job can still run for this executor.
    pub fn release_stale_lease(&self) -> usize {
        self.chain.abandon()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scheduling
    // ═══════════════════════════════════════════════════════════════════════

    /// Queue a continuation that re-adds `states` to the waitlist and resumes
    /// the algorithm
    pub fn schedule_run(self: &Arc<Self>, states: Vec<S>) {
        if self.chain.push(states) {
            self.submit_next();
        }
    }

    fn submit_next(self: &Arc<Self>) {
        let this = Arc::clone(self);
        if let Err(err) = self.shared.pool().submit(move || this.run_next()) {
            let dropped = self.chain.abandon();
            trace!(executor = %self.id, dropped, "continuation not submitted");
            self.shared.record_failure(err);
        }
    }

    fn run_next(self: &Arc<Self>) {
        if self.shared.pool().is_cancelled() {
            self.chain.abandon();
            return;
        }

        if let Some(states) = self.chain.next() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.apply(states))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.shared.record_failure(err),
                Err(payload) => self
                    .shared
                    .record_failure(InternalError::WorkerPanicked(panic_message(&*payload)).into()),
            }
        }

        if self.shared.should_terminate() {
            self.chain.abandon();
            return;
        }
        if self.chain.release_or_continue() {
            self.submit_next();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Continuation body
    // ═══════════════════════════════════════════════════════════════════════

    fn apply(self: &Arc<Self>, states_to_merge: Vec<S>) -> BamResult<()> {
        if self.shared.should_terminate() {
            if self.shared.shutdown_requested() {
                self.shared.cancel();
            }
            return Ok(());
        }

        let (_guard, concurrent) = ApplyGuard::enter(&self.active_applies);
        self.max_concurrent_applies.fetch_max(concurrent, Ordering::Relaxed);
        self.shared.observe_concurrent_applies(concurrent);
        self.applies.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let mut work = self
            .work
            .try_lock()
            .ok_or(InternalError::ConcurrentReachedSetAccess(self.id))?;
        if work.finalized {
            return Ok(());
        }
        let mut reached = self
            .reached
            .try_lock()
            .ok_or(InternalError::ConcurrentReachedSetAccess(self.id))?;

        for state in states_to_merge {
            if !reached.re_add_to_waitlist(&state) {
                return Err(InternalError::MissingBookkeeping(format!(
                    "state {:?} is not part of reached set {}",
                    state, self.id
                ))
                .into());
            }
            work.depends_on.remove(&state);
        }

        if !self.target_found() {
            let ctx = AlgorithmContext::new(
                &self.block,
                self.shared.data_manager(),
                self.shared.terminate_flag(),
                self.shared.shutdown_notifier(),
            );
            let outcome = work.algorithm.run(&mut reached, &ctx)?;

            if reached.target_state().is_some() {
                self.target_found.store(true, Ordering::Release);
            }

            match outcome {
                AlgorithmOutcome::Completed => {
                    if !self.target_found() && reached.has_waiting_state() {
                        self.schedule_run(Vec::new());
                    }
                }
                AlgorithmOutcome::Interrupted => {
                    debug!(executor = %self.id, "algorithm interrupted");
                    if self.shared.shutdown_requested() {
                        self.shared.cancel();
                    }
                    return Ok(());
                }
                AlgorithmOutcome::MissingBlock(missing) => {
                    self.handle_missing_block(&mut work, &mut reached, missing)?;
                }
            }
        }

        if work.depends_on.is_empty() && (self.target_found() || !reached.has_waiting_state()) {
            self.finish(&mut work, &reached)?;
        }

        self.shared
            .metrics()
            .apply_duration
            .observe(started.elapsed().as_secs_f64());
        Ok(())
    }

    fn handle_missing_block(
        self: &Arc<Self>,
        work: &mut WorkState<S, P>,
        reached: &mut ReachedSet<S, P>,
        missing: MissingBlock<S, P>,
    ) -> BamResult<()> {
        if self.target_found() || self.shared.should_terminate() {
            return Ok(());
        }

        let data_manager = self.shared.data_manager();
        let entry_location = missing.reduced_state.location();
        if data_manager.is_uncached_block_entry(entry_location) {
            return Err(InternalError::UncachedBlockSignalled(entry_location).into());
        }

        let _edges = self.shared.lock_dependencies();
        check_for_recursion(&self.shared, self, entry_location)?;

        let key = missing.cache_key();
        let (entry, created) = data_manager.get_or_create_reached_set(&key)?;
        data_manager.register_initial_state(missing.caller_state.clone(), entry.reached().clone());

        let caller_state = missing.caller_state;
        if let Some((child, new_child)) = self.shared.get_or_create_executor(&entry) {
            work.depends_on.insert(caller_state.clone());

            if child.add_depending_from(self.id, caller_state.clone()) {
                trace!(
                    executor = %self.id,
                    child = %child.id(),
                    block = %child.block().id(),
                    created_reached_set = created,
                    new_child,
                    "waiting on child"
                );
                if new_child {
                    child.schedule_run(Vec::new());
                }
            } else {
                work.depends_on.remove(&caller_state);
                self.resume_caller(reached, &caller_state)?;
            }
        } else {
            // summary appeared after the algorithm looked
            self.resume_caller(reached, &caller_state)?;
        }

        if reached.has_waiting_state() {
            self.schedule_run(Vec::new());
        }
        Ok(())
    }

    fn resume_caller(&self, reached: &mut ReachedSet<S, P>, caller_state: &S) -> BamResult<()> {
        if reached.re_add_to_waitlist(caller_state) {
            Ok(())
        } else {
            Err(InternalError::MissingBookkeeping(format!(
                "caller state {:?} is not part of reached set {}",
                caller_state, self.id
            ))
            .into())
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Finalization
    // ═══════════════════════════════════════════════════════════════════════

    fn finish(self: &Arc<Self>, work: &mut WorkState<S, P>, reached: &ReachedSet<S, P>) -> BamResult<()> {
        if work.finalized || self.shared.should_terminate() {
            return Ok(());
        }
        work.finalized = true;

        let exit_states = self.exit_states(reached);
        if let Some(entry) = &self.cache_entry {
            self.shared
                .data_manager()
                .set_exit_states(entry, exit_states.clone())?;
        }

        let parents = {
            let mut links = self.links.lock();
            links.finished = true;
            std::mem::take(&mut links.parents)
        };

        for (parent_id, parent_state) in parents {
            let parent = self
                .shared
                .executor(parent_id)
                .ok_or(InternalError::UnknownExecutor(parent_id))?;
            parent.schedule_run(vec![parent_state]);
        }

        let lifetime = self.created_at.elapsed();
        self.shared
            .metrics()
            .executor_lifetime
            .observe(lifetime.as_secs_f64());
        debug!(
            executor = %self.id,
            block = %self.block.id(),
            exit_states = exit_states.len(),
            states = reached.len(),
            target = self.target_found(),
            applies = self.applies(),
            elapsed_ms = lifetime.as_millis() as u64,
            "block executor finished"
        );

        self.shared.unregister(
            self,
            FinishedExecutor {
                id: self.id,
                block: self.block.id(),
                target_found: self.target_found(),
                is_root: self.is_root(),
            },
        );

        if self.is_root() {
            self.shared.mark_root_finished();
            self.shared.pool().shutdown();
        }
        Ok(())
    }

    /// Target alone if one was found, else the unexpanded states at the
    /// block's return nodes that have no successors
    fn exit_states(&self, reached: &ReachedSet<S, P>) -> Vec<S> {
        if let Some(target) = reached.target_state() {
            return vec![target.clone()];
        }

        let data_manager = self.shared.data_manager();
        reached
            .states()
            .filter(|state| self.block.is_return_node(state.location()))
            .filter(|state| !reached.has_successors(state))
            .filter(|state| !data_manager.was_already_returned_from_block(state, &self.block))
            .cloned()
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
