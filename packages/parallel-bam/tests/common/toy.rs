//! Toy analysis domain
//!
//! States are (location, integer value, target flag). The program is a set
//! of edges: plain steps that add a delta to the value, and block calls that
//! continue at a return location with the callee's exit value. Reduction
//! keeps the value, so two calls with the same value share a summary.

use parallel_bam::{
    AbstractState, AlgorithmContext, AlgorithmFactory, AlgorithmOutcome, BamError, BamResult,
    Block, BlockAlgorithm, BlockId, BlockPartition, CacheKey, CacheLookup, Location, MissingBlock,
    ReachedSet, ReachedSetId, ShutdownNotifier,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToyState {
    pub loc: Location,
    pub value: i64,
    pub target: bool,
}

impl ToyState {
    pub fn new(loc: u32, value: i64) -> Self {
        Self {
            loc: Location(loc),
            value,
            target: false,
        }
    }
}

impl AbstractState for ToyState {
    fn location(&self) -> Location {
        self.loc
    }

    fn is_target(&self) -> bool {
        self.target
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ToyEdge {
    Step { to: Location, delta: i64 },
    Call { block: BlockId, ret: Location },
}

pub struct ToyProgram {
    pub edges: HashMap<Location, Vec<ToyEdge>>,
    pub errors: HashSet<Location>,
    pub partition: Arc<BlockPartition>,
}

impl ToyProgram {
    pub fn edges(&self, loc: Location) -> &[ToyEdge] {
        self.edges.get(&loc).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn main_entry(&self) -> Location {
        self.partition
            .main_block()
            .entry()
            .expect("main block has an entry")
    }

    pub fn initial_state(&self) -> ToyState {
        ToyState {
            loc: self.main_entry(),
            value: 0,
            target: false,
        }
    }
}

/// Observations shared by all algorithm instances of a test
#[derive(Default)]
pub struct Recorder {
    runs: Mutex<HashMap<BlockId, usize>>,
    analyzed: Mutex<HashMap<BlockId, HashSet<ReachedSetId>>>,
    in_flight: Mutex<HashMap<ReachedSetId, usize>>,
    max_in_flight: Mutex<usize>,
    slow_block: Mutex<Option<(BlockId, Duration)>>,
    abort_in: Mutex<Option<(BlockId, ShutdownNotifier)>>,
    fail_in: Mutex<Option<BlockId>>,
    panic_in: Mutex<Option<BlockId>>,
    stall_in: Mutex<Option<BlockId>>,
    drop_targets: Mutex<bool>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sleep before every state processed in `block`
    pub fn slow_down(&self, block: BlockId, delay: Duration) {
        *self.slow_block.lock() = Some((block, delay));
    }

    pub fn clear_slow_down(&self) {
        *self.slow_block.lock() = None;
    }

    /// Request shutdown through `handle` when `block` processes its first state
    pub fn abort_in(&self, block: BlockId, handle: ShutdownNotifier) {
        *self.abort_in.lock() = Some((block, handle));
    }

    /// Make the algorithm fail in `block`
    pub fn fail_in(&self, block: BlockId) {
        *self.fail_in.lock() = Some(block);
    }

    /// Make the algorithm panic in `block`
    pub fn panic_in(&self, block: BlockId) {
        *self.panic_in.lock() = Some(block);
    }

    /// Make the algorithm in `block` report an interruption without any
    /// shutdown request
    pub fn stall_in(&self, block: BlockId) {
        *self.stall_in.lock() = Some(block);
    }

    /// Expand summaries without their target flag
    pub fn drop_targets(&self) {
        *self.drop_targets.lock() = true;
    }

    /// Algorithm invocations for `block`
    pub fn runs(&self, block: BlockId) -> usize {
        self.runs.lock().get(&block).copied().unwrap_or(0)
    }

    /// Distinct reached sets explored for `block`
    pub fn analyzed(&self, block: BlockId) -> usize {
        self.analyzed.lock().get(&block).map_or(0, HashSet::len)
    }

    /// Highest number of simultaneous runs on one reached set
    pub fn max_in_flight(&self) -> usize {
        *self.max_in_flight.lock()
    }

    fn enter(&self, block: BlockId, reached: ReachedSetId) {
        *self.runs.lock().entry(block).or_default() += 1;
        self.analyzed.lock().entry(block).or_default().insert(reached);

        let mut in_flight = self.in_flight.lock();
        let count = in_flight.entry(reached).or_default();
        *count += 1;
        let mut max = self.max_in_flight.lock();
        *max = (*max).max(*count);
    }

    fn leave(&self, reached: ReachedSetId) {
        if let Some(count) = self.in_flight.lock().get_mut(&reached) {
            *count -= 1;
        }
    }

    fn before_state(&self, block: BlockId) {
        let delay = match *self.slow_block.lock() {
            Some((slow, delay)) if slow == block => Some(delay),
            _ => None,
        };
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        if let Some((abort_block, handle)) = self.abort_in.lock().as_ref() {
            if *abort_block == block {
                handle.request_shutdown("test abort");
            }
        }
    }
}

pub struct ToyAlgorithm {
    program: Arc<ToyProgram>,
    recorder: Arc<Recorder>,
}

impl ToyAlgorithm {
    fn explore(
        &self,
        reached: &mut ReachedSet<ToyState, ()>,
        ctx: &AlgorithmContext<'_, ToyState, ()>,
    ) -> BamResult<AlgorithmOutcome<ToyState, ()>> {
        let block = ctx.block();

        if *self.recorder.fail_in.lock() == Some(block.id()) {
            return Err(BamError::algorithm(format!("toy failure in {}", block.id())));
        }
        let panics = *self.recorder.panic_in.lock() == Some(block.id());
        if panics {
            panic!("toy panic in {}", block.id());
        }
        if *self.recorder.stall_in.lock() == Some(block.id()) {
            return Ok(AlgorithmOutcome::Interrupted);
        }
        let drop_targets = *self.recorder.drop_targets.lock();

        while reached.has_waiting_state() {
            if ctx.should_stop() {
                return Ok(AlgorithmOutcome::Interrupted);
            }
            let Some(state) = reached.pop_from_waitlist() else {
                break;
            };
            self.recorder.before_state(block.id());

            if state.target {
                continue;
            }
            if block.is_return_node(state.loc)
                && !ctx
                    .data_manager()
                    .was_already_returned_from_block(&state, block)
            {
                continue;
            }

            for edge in self.program.edges(state.loc) {
                match *edge {
                    ToyEdge::Step { to, delta } => {
                        let successor = ToyState {
                            loc: to,
                            value: state.value + delta,
                            target: self.program.errors.contains(&to),
                        };
                        let is_target = successor.target;
                        reached.add_successor(&state, successor, ());
                        if is_target {
                            return Ok(AlgorithmOutcome::Completed);
                        }
                    }
                    ToyEdge::Call { block: callee_id, ret } => {
                        let callee = self
                            .program
                            .partition
                            .block(callee_id)
                            .cloned()
                            .ok_or_else(|| BamError::algorithm(format!("unknown block {}", callee_id)))?;
                        let entry = callee
                            .entry()
                            .ok_or_else(|| BamError::algorithm(format!("{} has no entry", callee_id)))?;
                        let reduced = ToyState {
                            loc: entry,
                            value: state.value,
                            target: false,
                        };
                        let key = CacheKey::new(reduced.clone(), (), Arc::clone(&callee));

                        match ctx.data_manager().summary(&key) {
                            CacheLookup::Hit(exits) => {
                                for exit in exits.iter() {
                                    let expanded = ToyState {
                                        loc: ret,
                                        value: exit.value,
                                        target: exit.target && !drop_targets,
                                    };
                                    ctx.data_manager().register_expansion(
                                        expanded.clone(),
                                        (),
                                        exit.clone(),
                                        &callee,
                                    );
                                    let is_target = expanded.target;
                                    reached.add_successor(&state, expanded, ());
                                    if is_target {
                                        return Ok(AlgorithmOutcome::Completed);
                                    }
                                }
                            }
                            CacheLookup::Miss | CacheLookup::Partial => {
                                return Ok(AlgorithmOutcome::MissingBlock(MissingBlock {
                                    block: callee,
                                    reduced_state: reduced,
                                    reduced_precision: (),
                                    caller_state: state,
                                }));
                            }
                        }
                    }
                }
            }
        }

        Ok(AlgorithmOutcome::Completed)
    }
}

impl BlockAlgorithm<ToyState, ()> for ToyAlgorithm {
    fn run(
        &mut self,
        reached: &mut ReachedSet<ToyState, ()>,
        ctx: &AlgorithmContext<'_, ToyState, ()>,
    ) -> BamResult<AlgorithmOutcome<ToyState, ()>> {
        let id = reached.id();
        self.recorder.enter(ctx.block().id(), id);
        let outcome = self.explore(reached, ctx);
        self.recorder.leave(id);
        outcome
    }
}

pub struct ToyFactory {
    pub program: Arc<ToyProgram>,
    pub recorder: Arc<Recorder>,
}

impl AlgorithmFactory<ToyState, ()> for ToyFactory {
    fn create(&self, _block: &Arc<Block>) -> Box<dyn BlockAlgorithm<ToyState, ()>> {
        Box::new(ToyAlgorithm {
            program: Arc::clone(&self.program),
            recorder: Arc::clone(&self.recorder),
        })
    }
}
