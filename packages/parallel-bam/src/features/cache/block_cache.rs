//! Block summary cache
//!
//! Maps a [`CacheKey`] to the reached set analysing that block instance and,
//! once the analysis finished, its exit states. Lookups are classified as
//! miss, partial hit (analysis still running or aborted) or full hit.

use super::metrics::{CacheCounts, CacheMetrics};
use super::types::{CacheEntry, CacheKey, CacheLookup};
use crate::errors::{BamResult, InternalError};
use crate::shared::models::{AbstractState, Precision, ReachedSetId, ReachedSetRef};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::Registry;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

pub struct BlockCache<S: AbstractState, P: Precision> {
    entries: DashMap<CacheKey<S, P>, Arc<CacheEntry<S, P>>, FxBuildHasher>,
    metrics: CacheMetrics,
}

impl<S: AbstractState, P: Precision> BlockCache<S, P> {
    pub fn new(registry: &Registry) -> BamResult<Self> {
        Ok(Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            metrics: CacheMetrics::new(registry)?,
        })
    }

    /// Register a new entry; an existing key is an internal error
    pub fn put(
        &self,
        key: CacheKey<S, P>,
        reached: ReachedSetRef<S, P>,
    ) -> BamResult<Arc<CacheEntry<S, P>>> {
        match self.entries.entry(key) {
            Entry::Occupied(occupied) => Err(InternalError::DuplicateCacheEntry(
                occupied.key().describe(),
            )
            .into()),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(CacheEntry::new(vacant.key().clone(), reached));
                vacant.insert(Arc::clone(&entry));
                self.metrics.inserts.inc();
                self.metrics.entries.inc();
                Ok(entry)
            }
        }
    }

    /// Counted lookup returning the entry itself
    pub fn get(&self, key: &CacheKey<S, P>) -> Option<Arc<CacheEntry<S, P>>> {
        let entry = self.peek(key);
        self.count(entry.as_deref());
        entry
    }

    /// Counted lookup returning the classification
    pub fn lookup(&self, key: &CacheKey<S, P>) -> CacheLookup<S> {
        let lookup = match self.peek(key) {
            None => CacheLookup::Miss,
            Some(entry) => match entry.exit_states() {
                Some(exits) => CacheLookup::Hit(exits),
                None => CacheLookup::Partial,
            },
        };
        match lookup {
            CacheLookup::Miss => self.metrics.misses.inc(),
            CacheLookup::Partial => self.metrics.partial_hits.inc(),
            CacheLookup::Hit(_) => self.metrics.full_hits.inc(),
        }
        lookup
    }

    /// Uncounted lookup for engine bookkeeping
    pub fn peek(&self, key: &CacheKey<S, P>) -> Option<Arc<CacheEntry<S, P>>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    fn count(&self, entry: Option<&CacheEntry<S, P>>) {
        match entry {
            None => self.metrics.misses.inc(),
            Some(e) if e.is_complete() => self.metrics.full_hits.inc(),
            Some(_) => self.metrics.partial_hits.inc(),
        }
    }

    pub fn entry_for_reached_set(&self, id: ReachedSetId) -> Option<Arc<CacheEntry<S, P>>> {
        self.entries
            .iter()
            .find(|e| e.value().reached().id() == id)
            .map(|e| Arc::clone(e.value()))
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<Arc<CacheEntry<S, P>>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Drop entries without exit states; returns how many were dropped
    pub fn remove_incomplete(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_complete());
        let removed = before.saturating_sub(self.entries.len());
        self.metrics.entries.set(self.entries.len() as i64);
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.metrics.entries.set(0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn counts(&self) -> CacheCounts {
        self.metrics.snapshot()
    }
}
