//! Reached set
//!
//! Ordered collection of abstract states with a FIFO waitlist, per-state
//! precision, successor edges and the first target state seen.
//!
//! A reached set is mutated by exactly one executor at a time. The shared
//! handle [`ReachedSetRef`] hands out `try_lock` guards so that a second
//! concurrent writer is detected instead of silently serialized.

use super::state::{AbstractState, Precision};
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REACHED_SET_ID: AtomicU64 = AtomicU64::new(1);

/// Unique reached-set identifier (also identifies the owning executor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReachedSetId(u64);

impl ReachedSetId {
    fn next() -> Self {
        Self(NEXT_REACHED_SET_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReachedSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rs#{}", self.0)
    }
}

pub struct ReachedSet<S: AbstractState, P: Precision> {
    id: ReachedSetId,
    /// States in insertion order
    states: Vec<S>,
    precisions: FxHashMap<S, P>,
    successors: FxHashMap<S, Vec<S>>,
    waitlist: VecDeque<S>,
    waiting: FxHashSet<S>,
    target: Option<S>,
}

impl<S: AbstractState, P: Precision> ReachedSet<S, P> {
    /// Create a reached set seeded with `initial` (which is put on the waitlist)
    pub fn new(initial: S, precision: P) -> Self {
        let mut reached = Self {
            id: ReachedSetId::next(),
            states: Vec::new(),
            precisions: FxHashMap::default(),
            successors: FxHashMap::default(),
            waitlist: VecDeque::new(),
            waiting: FxHashSet::default(),
            target: None,
        };
        reached.add(initial, precision);
        reached
    }

    pub fn id(&self) -> ReachedSetId {
        self.id
    }

    /// Add a state without a parent edge. Returns false if already present.
    pub fn add(&mut self, state: S, precision: P) -> bool {
        if self.precisions.contains_key(&state) {
            return false;
        }

        if self.target.is_none() && state.is_target() {
            self.target = Some(state.clone());
        }

        self.precisions.insert(state.clone(), precision);
        self.states.push(state.clone());
        self.waiting.insert(state.clone());
        self.waitlist.push_back(state);
        true
    }

    /// Add `child` as successor of `parent`
    ///
    /// The edge is always recorded; the state itself is only added (and
    /// queued) when it is new. Returns whether the state was new.
    pub fn add_successor(&mut self, parent: &S, child: S, precision: P) -> bool {
        let edges = self.successors.entry(parent.clone()).or_default();
        if !edges.contains(&child) {
            edges.push(child.clone());
        }
        self.add(child, precision)
    }

    pub fn pop_from_waitlist(&mut self) -> Option<S> {
        let state = self.waitlist.pop_front()?;
        self.waiting.remove(&state);
        Some(state)
    }

    /// Put an already reached state back on the waitlist
    ///
    /// Returns false if the state is not part of this reached set.
    pub fn re_add_to_waitlist(&mut self, state: &S) -> bool {
        if !self.precisions.contains_key(state) {
            return false;
        }
        if self.waiting.insert(state.clone()) {
            self.waitlist.push_back(state.clone());
        }
        true
    }

    pub fn has_waiting_state(&self) -> bool {
        !self.waitlist.is_empty()
    }

    pub fn waitlist_len(&self) -> usize {
        self.waitlist.len()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.precisions.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first_state(&self) -> &S {
        &self.states[0]
    }

    pub fn first_precision(&self) -> &P {
        &self.precisions[&self.states[0]]
    }

    pub fn precision(&self, state: &S) -> Option<&P> {
        self.precisions.get(state)
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.states.iter()
    }

    pub fn successors(&self, state: &S) -> &[S] {
        self.successors.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_successors(&self, state: &S) -> bool {
        self.successors
            .get(state)
            .is_some_and(|edges| !edges.is_empty())
    }

    /// First target state added to this reached set
    pub fn target_state(&self) -> Option<&S> {
        self.target.as_ref()
    }
}

impl<S: AbstractState, P: Precision> fmt::Debug for ReachedSet<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReachedSet")
            .field("id", &self.id)
            .field("states", &self.states.len())
            .field("waiting", &self.waitlist.len())
            .field("target", &self.target)
            .finish()
    }
}

/// Shared handle to a reached set
pub struct ReachedSetRef<S: AbstractState, P: Precision> {
    id: ReachedSetId,
    inner: Arc<Mutex<ReachedSet<S, P>>>,
}

impl<S: AbstractState, P: Precision> ReachedSetRef<S, P> {
    pub fn new(reached: ReachedSet<S, P>) -> Self {
        Self {
            id: reached.id(),
            inner: Arc::new(Mutex::new(reached)),
        }
    }

    pub fn id(&self) -> ReachedSetId {
        self.id
    }

    /// Non-blocking access for executors; `None` means another writer holds it
    pub fn try_lock(&self) -> Option<MutexGuard<'_, ReachedSet<S, P>>> {
        self.inner.try_lock()
    }

    /// Blocking access for readers outside the scheduler
    pub fn lock(&self) -> MutexGuard<'_, ReachedSet<S, P>> {
        self.inner.lock()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S: AbstractState, P: Precision> Clone for ReachedSetRef<S, P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AbstractState, P: Precision> fmt::Debug for ReachedSetRef<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReachedSetRef").field(&self.id).finish()
    }
}
