//! Builders for toy programs and engines

use super::toy::{Recorder, ToyEdge, ToyFactory, ToyProgram, ToyState};
use parallel_bam::{
    BamConfig, Block, BlockId, BlockPartition, DataManager, Location, ParallelBamAlgorithm,
    ReachedSet, ReachedSetRef,
};
use prometheus::Registry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct ProgramBuilder {
    edges: HashMap<Location, Vec<ToyEdge>>,
    errors: HashSet<Location>,
    main: Block,
    blocks: Vec<Block>,
}

impl ProgramBuilder {
    /// Program whose main block spans `entry..=exit`
    pub fn new(entry: u32, exit: u32) -> Self {
        Self {
            edges: HashMap::new(),
            errors: HashSet::new(),
            main: span_block(0, entry, exit),
            blocks: Vec::new(),
        }
    }

    /// Block `id` spanning `entry..=exit`
    pub fn block(mut self, id: u32, entry: u32, exit: u32) -> Self {
        self.blocks.push(span_block(id, entry, exit));
        self
    }

    pub fn step(mut self, from: u32, to: u32, delta: i64) -> Self {
        self.edges
            .entry(Location(from))
            .or_default()
            .push(ToyEdge::Step {
                to: Location(to),
                delta,
            });
        self
    }

    pub fn call(mut self, from: u32, block: u32, ret: u32) -> Self {
        self.edges
            .entry(Location(from))
            .or_default()
            .push(ToyEdge::Call {
                block: BlockId(block),
                ret: Location(ret),
            });
        self
    }

    pub fn error(mut self, loc: u32) -> Self {
        self.errors.insert(Location(loc));
        self
    }

    pub fn build(self) -> Arc<ToyProgram> {
        let mut partition = BlockPartition::builder(self.main);
        for block in self.blocks {
            partition = partition.block(block);
        }
        Arc::new(ToyProgram {
            edges: self.edges,
            errors: self.errors,
            partition: Arc::new(partition.build().expect("valid toy partition")),
        })
    }
}

fn span_block(id: u32, entry: u32, exit: u32) -> Block {
    let inner = (entry + 1)..exit;
    Block::new(
        BlockId(id),
        [Location(entry)],
        [Location(exit)],
        inner.map(Location),
    )
}

/// Engine plus everything a test wants to inspect afterwards
pub struct Harness {
    pub program: Arc<ToyProgram>,
    pub recorder: Arc<Recorder>,
    pub data_manager: Arc<DataManager<ToyState, ()>>,
    pub engine: ParallelBamAlgorithm<ToyState, ()>,
}

impl Harness {
    pub fn new(program: Arc<ToyProgram>, config: BamConfig) -> Self {
        let data_manager = Arc::new(
            DataManager::new(&Registry::new()).expect("data manager metrics register"),
        );
        Self::with_data_manager(program, config, data_manager)
    }

    /// Engine over an existing data manager (summaries of earlier runs)
    pub fn with_data_manager(
        program: Arc<ToyProgram>,
        config: BamConfig,
        data_manager: Arc<DataManager<ToyState, ()>>,
    ) -> Self {
        let recorder = Recorder::new();
        let factory = Arc::new(ToyFactory {
            program: Arc::clone(&program),
            recorder: Arc::clone(&recorder),
        });
        let engine = ParallelBamAlgorithm::new(
            config,
            Arc::clone(&program.partition),
            Arc::clone(&data_manager),
            factory,
            &Registry::new(),
        )
        .expect("engine builds");

        Self {
            program,
            recorder,
            data_manager,
            engine,
        }
    }

    /// Fresh main reached set at the program entry
    pub fn main_reached(&self) -> ReachedSetRef<ToyState, ()> {
        ReachedSetRef::new(ReachedSet::new(self.program.initial_state(), ()))
    }
}

/// Small, fast configuration for tests
pub fn test_config(workers: usize) -> BamConfig {
    BamConfig::default()
        .num_workers(workers)
        .stack_size_mb(2)
        .timeout(std::time::Duration::from_secs(30))
        .settle_grace(std::time::Duration::from_secs(2))
        .thread_name_prefix("bam-test")
}
