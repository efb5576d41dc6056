//! Shared domain models

pub mod block;
pub mod reached_set;
pub mod state;

pub use block::{Block, BlockId, BlockPartition, BlockPartitionBuilder, Location};
pub use reached_set::{ReachedSet, ReachedSetId, ReachedSetRef};
pub use state::{AbstractState, Precision};
