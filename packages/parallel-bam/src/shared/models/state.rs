//! Abstract state / precision contracts
//!
//! The engine never inspects states beyond these traits. Equality and hashing
//! are what make a state usable as (part of) a cache key.

use super::block::Location;
use std::fmt::Debug;
use std::hash::Hash;

/// Opaque abstract state produced by the single-block algorithm
pub trait AbstractState: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Program location this state belongs to
    fn location(&self) -> Location;

    /// Whether this state is a target (property violation)
    fn is_target(&self) -> bool {
        false
    }
}

/// Opaque precision attached to every reached state
pub trait Precision: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl Precision for () {}
