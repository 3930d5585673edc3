//! Running engine statistics.
//!
//! Lock-free counters updated after every scored transaction; a snapshot is
//! cheap enough to expose from a health endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latency above which an alert is logged, in milliseconds.
const HIGH_LATENCY_ALERT_MS: f64 = 500.0;

/// Aggregate counters over every transaction scored by an engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    total: AtomicU64,
    frauds: AtomicU64,
    latency_micros: AtomicU64,
}

impl EngineStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scored transaction into the counters, alerting when it blew
    /// the latency budget.
    pub fn record(&self, transaction_id: &str, latency_ms: f64, fraudulent: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if fraudulent {
            self.frauds.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_micros
            .fetch_add((latency_ms * 1000.0) as u64, Ordering::Relaxed);

        if latency_ms > HIGH_LATENCY_ALERT_MS {
            tracing::error!(
                transaction_id,
                latency_ms,
                threshold_ms = HIGH_LATENCY_ALERT_MS,
                "latency budget exceeded"
            );
        }
    }

    /// Current totals.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let frauds = self.frauds.load(Ordering::Relaxed);
        let latency_micros = self.latency_micros.load(Ordering::Relaxed);

        StatsSnapshot {
            total_transactions: total,
            fraud_detected: frauds,
            fraud_rate: if total == 0 {
                0.0
            } else {
                frauds as f64 / total as f64
            },
            avg_latency_ms: if total == 0 {
                0.0
            } else {
                latency_micros as f64 / 1000.0 / total as f64
            },
        }
    }
}

/// Point-in-time view of [`EngineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Transactions scored since engine start.
    pub total_transactions: u64,
    /// Transactions flagged as fraudulent.
    pub fraud_detected: u64,
    /// Fraction of scored transactions flagged.
    pub fraud_rate: f64,
    /// Mean end-to-end latency in milliseconds.
    pub avg_latency_ms: f64,
}
