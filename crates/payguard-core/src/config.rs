//! Engine configuration.
//!
//! Configuration for the fraud scoring engine, supporting:
//! - Programmatic configuration via a builder
//! - Environment variable overrides (`PAYGUARD_*`)
//! - File-based configuration (TOML/JSON)
//!
//! Fusion weights, the decision threshold and per-detector deadlines are
//! immutable once the engine is constructed; [`EngineConfig::validate`] is
//! the single gate enforcing the startup invariants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Tolerance when checking that fusion weights sum to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decision cutoff on the fused probability.
    pub fraud_threshold: f64,
    /// Fusion weight for the ML sub-score.
    pub ml_weight: f64,
    /// Fusion weight for the graph sub-score.
    pub graph_weight: f64,
    /// Fusion weight for the biometric sub-score.
    pub biometric_weight: f64,
    /// Per-task deadline for ML scoring.
    pub ml_timeout: Duration,
    /// Per-task deadline for graph analysis.
    pub graph_timeout: Duration,
    /// Per-task deadline for biometric analysis.
    pub biometric_timeout: Duration,
    /// Width of the transaction graph sliding window, in hours.
    pub graph_window_hours: i64,
    /// Minimum cycle length counted as a fraud ring.
    pub min_ring_size: usize,
    /// Remote cache host.
    pub cache_host: String,
    /// Remote cache port.
    pub cache_port: u16,
    /// TTL applied to cache entries.
    pub cache_ttl: Duration,
    /// Connect-probe timeout when selecting the cache backend at startup.
    pub cache_probe_timeout: Duration,
    /// Optional path to a trained classifier artifact.
    pub model_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fraud_threshold: 0.7,
            ml_weight: 0.5,
            graph_weight: 0.3,
            biometric_weight: 0.2,
            ml_timeout: Duration::from_millis(150),
            graph_timeout: Duration::from_millis(100),
            biometric_timeout: Duration::from_millis(100),
            graph_window_hours: 24,
            min_ring_size: 3,
            cache_host: "localhost".to_string(),
            cache_port: 6379,
            cache_ttl: Duration::from_secs(3600),
            cache_probe_timeout: Duration::from_secs(1),
            model_path: None,
        }
    }
}

impl EngineConfig {
    /// Production configuration: spec defaults, env-overridable.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Testing configuration: deterministic, never reaches a real cache.
    ///
    /// The cache endpoint points at a closed local port with a short probe
    /// timeout so construction falls back to the in-memory store quickly.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            cache_host: "127.0.0.1".to_string(),
            cache_port: 1,
            cache_probe_timeout: Duration::from_millis(50),
            cache_ttl: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Load configuration from `PAYGUARD_*` environment variables, starting
    /// from the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse::<f64>("PAYGUARD_FRAUD_THRESHOLD") {
            config.fraud_threshold = val;
        }
        if let Some(val) = env_parse::<f64>("PAYGUARD_ML_SCORE_WEIGHT") {
            config.ml_weight = val;
        }
        if let Some(val) = env_parse::<f64>("PAYGUARD_GRAPH_SCORE_WEIGHT") {
            config.graph_weight = val;
        }
        if let Some(val) = env_parse::<f64>("PAYGUARD_BIOMETRIC_WEIGHT") {
            config.biometric_weight = val;
        }
        if let Some(val) = env_parse::<u64>("PAYGUARD_ML_SCORING_TIMEOUT_MS") {
            config.ml_timeout = Duration::from_millis(val);
        }
        if let Some(val) = env_parse::<u64>("PAYGUARD_GRAPH_ANALYSIS_TIMEOUT_MS") {
            config.graph_timeout = Duration::from_millis(val);
        }
        if let Some(val) = env_parse::<u64>("PAYGUARD_BIOMETRIC_TIMEOUT_MS") {
            config.biometric_timeout = Duration::from_millis(val);
        }
        if let Some(val) = env_parse::<i64>("PAYGUARD_GRAPH_WINDOW_HOURS") {
            config.graph_window_hours = val;
        }
        if let Some(val) = env_parse::<usize>("PAYGUARD_MIN_FRAUD_RING_SIZE") {
            config.min_ring_size = val;
        }
        if let Ok(val) = std::env::var("PAYGUARD_CACHE_HOST") {
            config.cache_host = val;
        }
        if let Some(val) = env_parse::<u16>("PAYGUARD_CACHE_PORT") {
            config.cache_port = val;
        }
        if let Some(val) = env_parse::<u64>("PAYGUARD_CACHE_TTL_SECONDS") {
            config.cache_ttl = Duration::from_secs(val);
        }
        if let Ok(val) = std::env::var("PAYGUARD_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(val));
        }

        config
    }

    /// Load configuration from a TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        match ext {
            "json" => Ok(serde_json::from_str(&contents)?),
            "toml" => toml::from_str(&contents)
                .map_err(|e| EngineError::config(format!("TOML parse error: {e}"))),
            other => Err(EngineError::config(format!(
                "unsupported config format: {other}"
            ))),
        }
    }

    /// Create a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the startup invariants.
    ///
    /// Weights must be non-negative and sum to 1.0; the threshold must lie in
    /// [0, 1]; deadlines must be non-zero; window and ring size must be
    /// meaningful.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("ml_weight", self.ml_weight),
            ("graph_weight", self.graph_weight),
            ("biometric_weight", self.biometric_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::config(format!(
                    "{name} must be a non-negative finite number, got {weight}"
                )));
            }
        }

        let sum = self.ml_weight + self.graph_weight + self.biometric_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::config(format!(
                "fusion weights must sum to 1.0, got {sum}"
            )));
        }

        if !(0.0..=1.0).contains(&self.fraud_threshold) {
            return Err(EngineError::config(format!(
                "fraud_threshold must lie in [0, 1], got {}",
                self.fraud_threshold
            )));
        }

        for (name, timeout) in [
            ("ml_timeout", self.ml_timeout),
            ("graph_timeout", self.graph_timeout),
            ("biometric_timeout", self.biometric_timeout),
        ] {
            if timeout.is_zero() {
                return Err(EngineError::config(format!("{name} must be > 0")));
            }
        }

        if self.graph_window_hours <= 0 {
            return Err(EngineError::config("graph_window_hours must be > 0"));
        }
        if self.min_ring_size < 2 {
            return Err(EngineError::config("min_ring_size must be >= 2"));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the decision threshold.
    #[must_use]
    pub fn fraud_threshold(mut self, threshold: f64) -> Self {
        self.config.fraud_threshold = threshold;
        self
    }

    /// Set the three fusion weights (ml, graph, biometric).
    #[must_use]
    pub fn weights(mut self, ml: f64, graph: f64, biometric: f64) -> Self {
        self.config.ml_weight = ml;
        self.config.graph_weight = graph;
        self.config.biometric_weight = biometric;
        self
    }

    /// Set the ML scoring deadline.
    #[must_use]
    pub fn ml_timeout(mut self, timeout: Duration) -> Self {
        self.config.ml_timeout = timeout;
        self
    }

    /// Set the graph analysis deadline.
    #[must_use]
    pub fn graph_timeout(mut self, timeout: Duration) -> Self {
        self.config.graph_timeout = timeout;
        self
    }

    /// Set the biometric analysis deadline.
    #[must_use]
    pub fn biometric_timeout(mut self, timeout: Duration) -> Self {
        self.config.biometric_timeout = timeout;
        self
    }

    /// Set the graph sliding-window width in hours.
    #[must_use]
    pub fn graph_window_hours(mut self, hours: i64) -> Self {
        self.config.graph_window_hours = hours;
        self
    }

    /// Set the minimum cycle length counted as a fraud ring.
    #[must_use]
    pub fn min_ring_size(mut self, size: usize) -> Self {
        self.config.min_ring_size = size;
        self
    }

    /// Set the remote cache endpoint.
    #[must_use]
    pub fn cache_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.cache_host = host.into();
        self.config.cache_port = port;
        self
    }

    /// Set the cache entry TTL.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Set the classifier artifact path.
    #[must_use]
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    /// Build the configuration, enforcing the startup invariants.
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fraud_threshold, 0.7);
        assert_eq!(config.ml_timeout, Duration::from_millis(150));
        assert_eq!(config.graph_timeout, Duration::from_millis(100));
        assert_eq!(config.cache_port, 6379);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = EngineConfig {
            ml_weight: 0.5,
            graph_weight: 0.5,
            biometric_weight: 0.2,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let config = EngineConfig {
            ml_weight: -0.1,
            graph_weight: 0.9,
            biometric_weight: 0.2,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = EngineConfig {
            graph_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        let config = EngineConfig {
            fraud_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_rejects_invalid_weights() {
        let result = EngineConfig::builder().weights(0.4, 0.4, 0.4).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_accepts_rebalanced_weights() {
        let config = EngineConfig::builder()
            .weights(0.4, 0.4, 0.2)
            .fraud_threshold(0.8)
            .build()
            .unwrap();
        assert_eq!(config.fraud_threshold, 0.8);
        assert_eq!(config.ml_weight, 0.4);
    }

    #[test]
    fn test_testing_preset_points_at_closed_port() {
        let config = EngineConfig::testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_port, 1);
        assert!(config.cache_probe_timeout < Duration::from_secs(1));
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.cache_host, config.cache_host);
    }
}
