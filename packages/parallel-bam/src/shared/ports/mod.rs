//! Ports to external collaborators

pub mod algorithm;

pub use algorithm::{
    AlgorithmContext, AlgorithmFactory, AlgorithmOutcome, BlockAlgorithm, MissingBlock,
};
