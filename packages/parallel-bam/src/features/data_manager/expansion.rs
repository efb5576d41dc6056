//! Expansion bookkeeping
//!
//! When a summary is applied at a call site, every exit state of the callee
//! is expanded into the caller's context. This index remembers which reduced
//! (callee) state each expanded state came from, the block it returned from
//! and the precision it was expanded with. Following `expanded -> reduced`
//! repeatedly walks outward-in through nested block returns.

use crate::errors::{BamResult, InternalError};
use crate::shared::models::{AbstractState, Block, Precision};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct ExpansionIndex<S: AbstractState, P: Precision> {
    expanded_to_reduced: FxHashMap<S, S>,
    expanded_to_block: FxHashMap<S, Arc<Block>>,
    expanded_to_precision: FxHashMap<S, P>,
}

impl<S: AbstractState, P: Precision> Default for ExpansionIndex<S, P> {
    fn default() -> Self {
        Self {
            expanded_to_reduced: FxHashMap::default(),
            expanded_to_block: FxHashMap::default(),
            expanded_to_precision: FxHashMap::default(),
        }
    }
}

impl<S: AbstractState, P: Precision> ExpansionIndex<S, P> {
    pub fn register(&mut self, expanded: S, precision: P, reduced: S, block: Arc<Block>) {
        self.expanded_to_reduced.insert(expanded.clone(), reduced);
        self.expanded_to_block.insert(expanded.clone(), block);
        self.expanded_to_precision.insert(expanded, precision);
    }

    pub fn is_innermost(&self, state: &S) -> bool {
        !self.expanded_to_reduced.contains_key(state)
    }

    /// Follow `expanded -> reduced` to the end
    pub fn innermost(&self, state: &S) -> S {
        self.chain(state).pop().unwrap_or_else(|| state.clone())
    }

    /// `state` followed by every reduced state behind it, outermost first
    ///
    /// A mapping cycle ends the walk at the first repeated state.
    pub fn chain(&self, state: &S) -> Vec<S> {
        let mut chain = vec![state.clone()];
        let mut seen: FxHashSet<&S> = FxHashSet::default();
        let mut current = state;
        seen.insert(current);

        while let Some(reduced) = self.expanded_to_reduced.get(current) {
            if !seen.insert(reduced) {
                break;
            }
            chain.push(reduced.clone());
            current = reduced;
        }
        chain
    }

    pub fn precision(&self, expanded: &S) -> Option<&P> {
        self.expanded_to_precision.get(expanded)
    }

    pub fn block(&self, expanded: &S) -> Option<&Arc<Block>> {
        self.expanded_to_block.get(expanded)
    }

    /// Some expansion on the chain from `state` returned from `block`
    pub fn already_returned_from(&self, state: &S, block: &Block) -> bool {
        let mut seen: FxHashSet<&S> = FxHashSet::default();
        let mut current = state;

        while let Some(reduced) = self.expanded_to_reduced.get(current) {
            if !seen.insert(current) {
                return false;
            }
            if self
                .expanded_to_block
                .get(current)
                .is_some_and(|b| b.id() == block.id())
            {
                return true;
            }
            current = reduced;
        }
        false
    }

    /// Move all bookkeeping of `old` to `new`
    pub fn replace(&mut self, old: &S, new: S, must_exist: bool) -> BamResult<()> {
        if must_exist && !self.expanded_to_reduced.contains_key(old) {
            return Err(InternalError::MissingBookkeeping(format!(
                "no expansion recorded for {:?}",
                old
            ))
            .into());
        }

        if let Some(reduced) = self.expanded_to_reduced.remove(old) {
            self.expanded_to_reduced.insert(new.clone(), reduced);
        }
        if let Some(block) = self.expanded_to_block.remove(old) {
            self.expanded_to_block.insert(new.clone(), block);
        }
        if let Some(precision) = self.expanded_to_precision.remove(old) {
            self.expanded_to_precision.insert(new, precision);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.expanded_to_reduced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded_to_reduced.is_empty()
    }

    pub fn clear(&mut self) {
        self.expanded_to_reduced.clear();
        self.expanded_to_block.clear();
        self.expanded_to_precision.clear();
    }
}
