use crate::config::ConfigError;
use crate::shared::models::{BlockId, Location, ReachedSetId};
use thiserror::Error;

pub type BamResult<T> = std::result::Result<T, BamError>;

#[derive(Error, Debug)]
pub enum BamError {
    #[error("Task rejected: worker pool is shut down")]
    TaskRejected,

    #[error("Recursion is not supported: location {location} re-enters block {block}")]
    RecursionUnsupported { location: Location, block: BlockId },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Internal consistency violation: {0}")]
    Internal(#[from] InternalError),

    #[error("Worker failed: {0}")]
    Worker(Box<BamError>),

    #[error("Invalid block partition: {0}")]
    InvalidPartition(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Broken engine invariants. Never caused by the analysed program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("Cache entry already exists for {0}")]
    DuplicateCacheEntry(String),

    #[error("Exit states for {key} differ from the stored summary ({stored} vs {offered} states)")]
    InconsistentExitStates {
        key: String,
        stored: usize,
        offered: usize,
    },

    #[error("Target found in sub-analysis of block {block} but not in the main reached set")]
    TargetAsymmetry { block: BlockId },

    #[error("Missing bookkeeping: {0}")]
    MissingBookkeeping(String),

    #[error("Reached set {0} accessed by two workers at once")]
    ConcurrentReachedSetAccess(ReachedSetId),

    #[error("Executor {0} is not registered")]
    UnknownExecutor(ReachedSetId),

    #[error("Main executor did not finish although the worker pool terminated")]
    RootNotFinished,

    #[error("Missing-block signal for uncached block entry {0}")]
    UncachedBlockSignalled(Location),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

impl BamError {
    pub fn algorithm<E: std::fmt::Display>(e: E) -> Self {
        Self::Algorithm(e.to_string())
    }

    pub fn internal(e: InternalError) -> Self {
        Self::Internal(e)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BamError::TaskRejected => ErrorCategory::Transient,
            BamError::RecursionUnsupported { .. }
            | BamError::Algorithm(_)
            | BamError::InvalidPartition(_) => ErrorCategory::Program,
            BamError::Internal(_) => ErrorCategory::Internal,
            BamError::Worker(inner) => inner.category(),
            BamError::Config(_) | BamError::Metrics(_) | BamError::ThreadPool(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Innermost error behind any number of `Worker` wrappers
    pub fn root_cause(&self) -> &BamError {
        let mut current = self;
        while let BamError::Worker(inner) = current {
            current = inner;
        }
        current
    }
}

/// Error category for failure routing at the task boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Scheduling noise after shutdown - log and drop
    Transient,
    /// Unsupported input program or collaborator failure
    Program,
    /// Engine bug
    Internal,
    /// Pool / metrics / configuration setup
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Program => "program",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transient" => Some(ErrorCategory::Transient),
            "program" => Some(ErrorCategory::Program),
            "internal" => Some(ErrorCategory::Internal),
            "infrastructure" => Some(ErrorCategory::Infrastructure),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
