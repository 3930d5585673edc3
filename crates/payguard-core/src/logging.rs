//! Logging setup.
//!
//! Thin wrapper over `tracing-subscriber` so binaries and tests wire the
//! same output shape: plain text for development, JSON for log aggregation.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(EngineError::config(format!("invalid log level: {other}"))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level.
    pub level: LogLevel,
    /// Emit structured JSON output instead of human-readable lines.
    pub structured: bool,
    /// Include the emitting module path on each line.
    pub include_target: bool,
}

impl LogConfig {
    /// Production logging: info-level structured JSON.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            structured: true,
            include_target: true,
        }
    }

    /// Install a global subscriber for this configuration.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init(&self) -> Result<()> {
        let level: tracing::Level = self.level.into();
        let builder = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(self.include_target);

        let result = if self.structured {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        result.map_err(|e| EngineError::internal(format!("logging init failed: {e}")))
    }
}
