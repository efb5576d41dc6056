//! Central store for block summaries and expansion bookkeeping
//!
//! Shared by every executor of a run and kept across runs. A run that ends
//! abnormally marks the manager tainted; the next run starts from a clean
//! store.

use super::expansion::ExpansionIndex;
use crate::errors::BamResult;
use crate::features::cache::{BlockCache, CacheEntry, CacheKey, CacheLookup};
use crate::shared::models::{
    AbstractState, Block, Location, Precision, ReachedSet, ReachedSetRef,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use prometheus::Registry;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DataManager<S: AbstractState, P: Precision> {
    cache: BlockCache<S, P>,
    /// Spans lookup + create in `get_or_create_reached_set`
    creation_lock: Mutex<()>,
    expansions: RwLock<ExpansionIndex<S, P>>,
    /// Call state -> reached set that analyses the called block
    initial_states: DashMap<S, ReachedSetRef<S, P>, FxBuildHasher>,
    uncached_entries: RwLock<FxHashSet<Location>>,
    tainted: AtomicBool,
}

impl<S: AbstractState, P: Precision> DataManager<S, P> {
    pub fn new(registry: &Registry) -> BamResult<Self> {
        Ok(Self {
            cache: BlockCache::new(registry)?,
            creation_lock: Mutex::new(()),
            expansions: RwLock::new(ExpansionIndex::default()),
            initial_states: DashMap::with_hasher(FxBuildHasher),
            uncached_entries: RwLock::new(FxHashSet::default()),
            tainted: AtomicBool::new(false),
        })
    }

    pub fn cache(&self) -> &BlockCache<S, P> {
        &self.cache
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reached sets
    // ═══════════════════════════════════════════════════════════════════════

    /// Fresh reached set seeded with `entry_state`, registered in the cache
    pub fn create_and_register_reached_set(
        &self,
        entry_state: S,
        precision: P,
        block: Arc<Block>,
    ) -> BamResult<Arc<CacheEntry<S, P>>> {
        let key = CacheKey::new(entry_state.clone(), precision.clone(), block);
        let reached = ReachedSetRef::new(ReachedSet::new(entry_state, precision));
        let entry = self.cache.put(key, reached)?;
        debug!(
            reached_set = %entry.reached().id(),
            block = %entry.key().block().id(),
            "created block reached set"
        );
        Ok(entry)
    }

    /// Entry for `key`, creating it when absent
    ///
    /// Concurrent misses on one key yield a single reached set. The boolean
    /// is true for the caller that created it.
    pub fn get_or_create_reached_set(
        &self,
        key: &CacheKey<S, P>,
    ) -> BamResult<(Arc<CacheEntry<S, P>>, bool)> {
        let _guard = self.creation_lock.lock();
        if let Some(entry) = self.cache.peek(key) {
            return Ok((entry, false));
        }
        let entry = self.create_and_register_reached_set(
            key.state().clone(),
            key.precision().clone(),
            Arc::clone(key.block()),
        )?;
        Ok((entry, true))
    }

    /// Algorithm-facing summary lookup (counted)
    pub fn summary(&self, key: &CacheKey<S, P>) -> CacheLookup<S> {
        self.cache.lookup(key)
    }

    /// Store the summary of a finished block analysis
    pub fn set_exit_states(&self, entry: &CacheEntry<S, P>, exit_states: Vec<S>) -> BamResult<()> {
        entry.set_exit_states(exit_states).inspect_err(|_| {
            self.cache.metrics().inconsistencies.inc();
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Expansion bookkeeping
    // ═══════════════════════════════════════════════════════════════════════

    pub fn register_expansion(&self, expanded: S, expanded_precision: P, reduced: S, block: &Arc<Block>) {
        self.expansions
            .write()
            .register(expanded, expanded_precision, reduced, Arc::clone(block));
    }

    pub fn is_innermost(&self, state: &S) -> bool {
        self.expansions.read().is_innermost(state)
    }

    pub fn innermost_state(&self, state: &S) -> S {
        self.expansions.read().innermost(state)
    }

    /// `state` and the reduced states behind it, outermost first
    pub fn expanded_chain(&self, state: &S) -> Vec<S> {
        self.expansions.read().chain(state)
    }

    pub fn expanded_precision(&self, state: &S) -> Option<P> {
        self.expansions.read().precision(state).cloned()
    }

    pub fn was_already_returned_from_block(&self, state: &S, block: &Block) -> bool {
        self.expansions.read().already_returned_from(state, block)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Initial states
    // ═══════════════════════════════════════════════════════════════════════

    pub fn register_initial_state(&self, call_state: S, reached: ReachedSetRef<S, P>) {
        self.initial_states.insert(call_state, reached);
    }

    pub fn reached_set_for_initial_state(&self, call_state: &S) -> Option<ReachedSetRef<S, P>> {
        self.initial_states.get(call_state).map(|r| r.value().clone())
    }

    /// Re-key every bookkeeping map from `old` to `new`
    ///
    /// With `must_exist`, `old` must have an expansion record.
    pub fn replace_state(&self, old: &S, new: S, must_exist: bool) -> BamResult<()> {
        self.expansions.write().replace(old, new.clone(), must_exist)?;
        if let Some((_, reached)) = self.initial_states.remove(old) {
            self.initial_states.insert(new, reached);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Uncached block entries
    // ═══════════════════════════════════════════════════════════════════════

    /// Mark `node` as a block entry the algorithm inlines instead of summarizing
    pub fn add_uncached_block_entry(&self, node: Location) {
        self.uncached_entries.write().insert(node);
    }

    pub fn is_uncached_block_entry(&self, node: Location) -> bool {
        self.uncached_entries.read().contains(&node)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Drop cache and bookkeeping (uncached entries are configuration and stay)
    pub fn clear(&self) {
        let _guard = self.creation_lock.lock();
        self.cache.clear();
        self.expansions.write().clear();
        self.initial_states.clear();
    }

    /// Record that the current run ended abnormally
    pub fn mark_tainted(&self) {
        self.tainted.store(true, Ordering::Release);
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted.load(Ordering::Acquire)
    }

    /// Reset state left behind by the previous run
    ///
    /// After an aborted run everything is dropped; otherwise only entries
    /// without exit states. Returns the number of dropped cache entries.
    pub fn prepare_for_run(&self) -> usize {
        if self.tainted.swap(false, Ordering::AcqRel) {
            let dropped = self.cache.len();
            self.clear();
            info!(dropped, "previous run was aborted, cleared block cache");
            dropped
        } else {
            let _guard = self.creation_lock.lock();
            let dropped = self.cache.remove_incomplete();
            if dropped > 0 {
                debug!(dropped, "dropped incomplete block cache entries");
            }
            dropped
        }
    }
}
