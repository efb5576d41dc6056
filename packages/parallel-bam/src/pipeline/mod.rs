//! Run orchestration: coordinator, worker pool and run status

pub mod coordinator;
pub mod status;
pub mod worker_pool;

pub use coordinator::ParallelBamAlgorithm;
pub use status::{BamStatus, RunStatistics};
pub use worker_pool::WorkerPool;
