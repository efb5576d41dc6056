//! Block executors and the per-run scheduler context
//!
//! One executor per reached set. Executors form a dependency graph through
//! `depends_on` (own states waiting on a child) and `depending_from`
//! (parents waiting on this executor); edges are executor ids resolved
//! through the live registry in [`SchedulerShared`].

pub mod block_executor;
pub mod metrics;
pub mod recursion;
pub mod scheduler;
pub mod task_chain;

pub use block_executor::{BlockExecutor, ExecutorId};
pub use metrics::SchedulerMetrics;
pub use scheduler::{FinishedExecutor, SchedulerCounters, SchedulerShared};
pub use task_chain::TaskChain;
