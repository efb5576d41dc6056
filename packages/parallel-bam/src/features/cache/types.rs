//! Cache key and entry types

use crate::errors::{BamResult, InternalError};
use crate::shared::models::{AbstractState, Block, Precision, ReachedSetRef};
use rustc_hash::FxHashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Summary cache key: (reduced entry state, reduced precision, block)
#[derive(Debug, Clone)]
pub struct CacheKey<S: AbstractState, P: Precision> {
    state: S,
    precision: P,
    block: Arc<Block>,
}

impl<S: AbstractState, P: Precision> CacheKey<S, P> {
    pub fn new(state: S, precision: P, block: Arc<Block>) -> Self {
        Self {
            state,
            precision,
            block,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn precision(&self) -> &P {
        &self.precision
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    /// Short human-readable form for error messages
    pub fn describe(&self) -> String {
        format!("{:?} in {}", self.state, self.block.id())
    }
}

impl<S: AbstractState, P: Precision> PartialEq for CacheKey<S, P> {
    fn eq(&self, other: &Self) -> bool {
        self.block.id() == other.block.id()
            && self.state == other.state
            && self.precision == other.precision
    }
}

impl<S: AbstractState, P: Precision> Eq for CacheKey<S, P> {}

impl<S: AbstractState, P: Precision> Hash for CacheKey<S, P> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.block.id().hash(hasher);
        self.state.hash(hasher);
        self.precision.hash(hasher);
    }
}

/// Reached set of one block analysis plus its summary once finished
#[derive(Debug)]
pub struct CacheEntry<S: AbstractState, P: Precision> {
    key: CacheKey<S, P>,
    reached: ReachedSetRef<S, P>,
    exit_states: OnceLock<Arc<Vec<S>>>,
}

impl<S: AbstractState, P: Precision> CacheEntry<S, P> {
    pub(crate) fn new(key: CacheKey<S, P>, reached: ReachedSetRef<S, P>) -> Self {
        Self {
            key,
            reached,
            exit_states: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &CacheKey<S, P> {
        &self.key
    }

    pub fn reached(&self) -> &ReachedSetRef<S, P> {
        &self.reached
    }

    pub fn exit_states(&self) -> Option<Arc<Vec<S>>> {
        self.exit_states.get().cloned()
    }

    /// Entry has a summary (exit states were set)
    pub fn is_complete(&self) -> bool {
        self.exit_states.get().is_some()
    }

    /// Store the summary
    ///
    /// Set at most once. Re-setting with the same states (in any order) is
    /// accepted; a different set is an internal error.
    pub fn set_exit_states(&self, states: Vec<S>) -> BamResult<()> {
        let mut pending = Some(states);
        let stored = self
            .exit_states
            .get_or_init(|| Arc::new(pending.take().unwrap_or_default()));

        match pending {
            None => Ok(()),
            Some(states) if same_states(stored, &states) => Ok(()),
            Some(states) => Err(InternalError::InconsistentExitStates {
                key: self.key.describe(),
                stored: stored.len(),
                offered: states.len(),
            }
            .into()),
        }
    }
}

fn same_states<S: AbstractState>(a: &[S], b: &[S]) -> bool {
    let a: FxHashSet<&S> = a.iter().collect();
    let b: FxHashSet<&S> = b.iter().collect();
    a == b
}

/// Lookup classification
#[derive(Debug, Clone)]
pub enum CacheLookup<S: AbstractState> {
    /// No entry for the key
    Miss,
    /// Entry exists but its analysis has not finished
    Partial,
    /// Entry with exit states
    Hit(Arc<Vec<S>>),
}

impl<S: AbstractState> CacheLookup<S> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}
