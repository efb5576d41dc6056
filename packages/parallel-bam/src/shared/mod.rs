//! Shared models, ports and signals used across features

pub mod models;
pub mod ports;
pub mod shutdown;

pub use shutdown::ShutdownNotifier;
