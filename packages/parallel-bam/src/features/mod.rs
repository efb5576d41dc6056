//! Engine features: summary cache, data manager, block executors

pub mod cache;
pub mod data_manager;
pub mod executor;
