//! Single-block algorithm port
//!
//! The engine does not explore states itself. It drives an external
//! algorithm that runs one block's reached set until the waitlist is empty,
//! a target is found, or a block call needs a summary that is not cached.

use crate::errors::BamResult;
use crate::features::cache::CacheKey;
use crate::features::data_manager::DataManager;
use crate::shared::models::{AbstractState, Block, Precision, ReachedSet};
use crate::shared::shutdown::ShutdownNotifier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why an algorithm run returned
#[derive(Debug)]
pub enum AlgorithmOutcome<S: AbstractState, P: Precision> {
    /// Waitlist exhausted or target found
    Completed,
    /// A block call needs a summary that is absent or incomplete
    MissingBlock(MissingBlock<S, P>),
    /// Stopped on request; the reached set may still have waiting states
    Interrupted,
}

/// Missing-block signal
///
/// `caller_state` has already been taken off the waitlist by the algorithm.
/// It is put back once the summary is available.
#[derive(Debug, Clone)]
pub struct MissingBlock<S: AbstractState, P: Precision> {
    pub block: Arc<Block>,
    pub reduced_state: S,
    pub reduced_precision: P,
    pub caller_state: S,
}

impl<S: AbstractState, P: Precision> MissingBlock<S, P> {
    pub fn cache_key(&self) -> CacheKey<S, P> {
        CacheKey::new(
            self.reduced_state.clone(),
            self.reduced_precision.clone(),
            Arc::clone(&self.block),
        )
    }
}

/// Everything an algorithm run may consult besides its reached set
pub struct AlgorithmContext<'a, S: AbstractState, P: Precision> {
    block: &'a Arc<Block>,
    data_manager: &'a DataManager<S, P>,
    terminate: &'a AtomicBool,
    shutdown: &'a ShutdownNotifier,
}

impl<'a, S: AbstractState, P: Precision> AlgorithmContext<'a, S, P> {
    pub fn new(
        block: &'a Arc<Block>,
        data_manager: &'a DataManager<S, P>,
        terminate: &'a AtomicBool,
        shutdown: &'a ShutdownNotifier,
    ) -> Self {
        Self {
            block,
            data_manager,
            terminate,
            shutdown,
        }
    }

    /// Block the reached set belongs to
    pub fn block(&self) -> &Arc<Block> {
        self.block
    }

    pub fn data_manager(&self) -> &DataManager<S, P> {
        self.data_manager
    }

    /// Algorithms poll this between states and return
    /// [`AlgorithmOutcome::Interrupted`] when it is set.
    pub fn should_stop(&self) -> bool {
        self.terminate.load(Ordering::Acquire) || self.shutdown.should_shutdown()
    }
}

/// Single-block exploration algorithm
pub trait BlockAlgorithm<S: AbstractState, P: Precision>: Send {
    fn run(
        &mut self,
        reached: &mut ReachedSet<S, P>,
        ctx: &AlgorithmContext<'_, S, P>,
    ) -> BamResult<AlgorithmOutcome<S, P>>;
}

/// Creates one algorithm instance per executor
pub trait AlgorithmFactory<S: AbstractState, P: Precision>: Send + Sync {
    fn create(&self, block: &Arc<Block>) -> Box<dyn BlockAlgorithm<S, P>>;
}

impl<S, P, F> AlgorithmFactory<S, P> for F
where
    S: AbstractState,
    P: Precision,
    F: Fn(&Arc<Block>) -> Box<dyn BlockAlgorithm<S, P>> + Send + Sync,
{
    fn create(&self, block: &Arc<Block>) -> Box<dyn BlockAlgorithm<S, P>> {
        self(block)
    }
}
