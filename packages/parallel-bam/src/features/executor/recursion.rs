//! Recursion detection over waiting parents
//!
//! Entering a block whose entry is a call node of the current block or of
//! any executor (transitively) waiting on it would make the analysis wait on
//! itself. Such programs are rejected.

use super::block_executor::{BlockExecutor, ExecutorId};
use super::scheduler::SchedulerShared;
use crate::errors::{BamError, BamResult};
use crate::shared::models::{AbstractState, Location, Precision};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

/// BFS over `depending_from` edges starting at (and including) `start`
pub fn check_for_recursion<S: AbstractState, P: Precision>(
    shared: &SchedulerShared<S, P>,
    start: &Arc<BlockExecutor<S, P>>,
    entry_location: Location,
) -> BamResult<()> {
    let mut visited: FxHashSet<ExecutorId> = FxHashSet::default();
    let mut queue: VecDeque<Arc<BlockExecutor<S, P>>> = VecDeque::new();
    visited.insert(start.id());
    queue.push_back(Arc::clone(start));

    while let Some(executor) = queue.pop_front() {
        if executor.block().is_call_node(entry_location) {
            return Err(BamError::RecursionUnsupported {
                location: entry_location,
                block: executor.block().id(),
            });
        }

        for parent_id in executor.parent_ids() {
            if !visited.insert(parent_id) {
                continue;
            }
            // a parent that already left the registry is not waiting anymore
            if let Some(parent) = shared.executor(parent_id) {
                queue.push_back(parent);
            }
        }
    }
    Ok(())
}
