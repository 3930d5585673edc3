//! Error types for the payguard workspace.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur across the fraud scoring pipeline.
///
/// The scoring call itself is total: detector faults and timeouts are
/// absorbed into per-detector defaults and never surface to callers. These
/// variants cover construction, configuration and backend plumbing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration invariant violated at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input failed boundary validation.
    #[error("Input validation failed: {0}")]
    Validation(String),

    /// The remote cache backend could not be reached at startup.
    #[error("Cache backend unavailable: {0}")]
    CacheUnavailable(String),

    /// A cache operation failed at request time.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Model artifact could not be loaded or produced unusable output.
    #[error("Model error: {0}")]
    Model(String),

    /// A detector exceeded its deadline.
    #[error("Detector timed out after {0:?}")]
    Timeout(Duration),

    /// Graph analysis fault.
    #[error("Graph error: {0}")]
    Graph(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Create a request-time cache error.
    #[must_use]
    pub fn cache(msg: impl Into<String>) -> Self {
        EngineError::Cache(msg.into())
    }

    /// Create a model error.
    #[must_use]
    pub fn model(msg: impl Into<String>) -> Self {
        EngineError::Model(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }

    /// True when the request that hit this error can be retried or served
    /// from defaults without restarting the engine.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::Cache(_)
                | EngineError::Timeout(_)
                | EngineError::Validation(_)
                | EngineError::Graph(_)
        )
    }
}
