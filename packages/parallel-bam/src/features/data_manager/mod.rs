//! Summary store and expansion bookkeeping shared by all executors

pub mod expansion;
pub mod manager;

pub use expansion::ExpansionIndex;
pub use manager::DataManager;
