// Error types for metric sources and the sampling engine

use std::time::Duration;
use thiserror::Error;

/// Failure of a single adapter call. Never fatal: the sampler maps it to an
/// unavailable field for the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("collection failed: {0}")]
    Collection(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Previous call to the same source has not returned yet.
    #[error("previous call still running")]
    Busy,

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl SourceError {
    pub fn collection(msg: impl Into<String>) -> Self {
        SourceError::Collection(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The periodic loop needs a Tokio runtime; nothing else aborts startup.
    #[error("no Tokio runtime available to schedule sampling")]
    NoRuntime,

    #[error("unknown series {0:?} (expected \"cpu\" or \"memory\")")]
    UnknownSeries(String),
}
