//! Transaction and score data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};

// ============================================================================
// Transaction Types
// ============================================================================

/// A payment transaction submitted for fraud analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque transaction identifier.
    pub transaction_id: String,
    /// Sending account identifier.
    pub sender_id: String,
    /// Receiving account identifier.
    pub receiver_id: String,
    /// Transaction amount, strictly positive.
    pub amount: f64,
    /// Transaction timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Device the transaction originated from.
    pub device_id: String,
    /// Source IP address.
    pub ip_address: String,
    /// Optional behavioral biometric sample captured with the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric: Option<BiometricSample>,
    /// Optional opaque metadata, unused by the scoring pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Transaction {
    /// Validate boundary invariants: non-empty identifiers and a positive amount.
    ///
    /// Intended for the request boundary; the engine itself assumes
    /// transactions passed to it have already been validated.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.is_empty() {
            return Err(EngineError::validation("transaction_id must not be empty"));
        }
        if self.sender_id.is_empty() || self.receiver_id.is_empty() {
            return Err(EngineError::validation(
                "sender_id and receiver_id must not be empty",
            ));
        }
        if !(self.amount > 0.0) {
            return Err(EngineError::validation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// A behavioral biometric sample: four optional scalar channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Typing cadence, characters per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_speed: Option<f64>,
    /// Touch swipe velocity, pixels per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swipe_velocity: Option<f64>,
    /// Touch pressure pattern, normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_pattern: Option<f64>,
    /// Device tilt angle, degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_angle: Option<f64>,
}

impl BiometricSample {
    /// Value for a single channel, if present in this sample.
    #[must_use]
    pub fn channel(&self, channel: BiometricChannel) -> Option<f64> {
        match channel {
            BiometricChannel::TypingSpeed => self.typing_speed,
            BiometricChannel::SwipeVelocity => self.swipe_velocity,
            BiometricChannel::PressurePattern => self.pressure_pattern,
            BiometricChannel::DeviceAngle => self.device_angle,
        }
    }

    /// Iterate over all channels with their (possibly absent) values.
    pub fn channels(&self) -> impl Iterator<Item = (BiometricChannel, Option<f64>)> + '_ {
        BiometricChannel::ALL
            .iter()
            .map(move |&c| (c, self.channel(c)))
    }

    /// True when no channel carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels().all(|(_, v)| v.is_none())
    }
}

/// The four behavioral biometric channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricChannel {
    /// Typing cadence.
    TypingSpeed,
    /// Swipe velocity.
    SwipeVelocity,
    /// Touch pressure pattern.
    PressurePattern,
    /// Device tilt angle.
    DeviceAngle,
}

impl BiometricChannel {
    /// All channels, in canonical order.
    pub const ALL: [BiometricChannel; 4] = [
        BiometricChannel::TypingSpeed,
        BiometricChannel::SwipeVelocity,
        BiometricChannel::PressurePattern,
        BiometricChannel::DeviceAngle,
    ];

    /// Stable string name of the channel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BiometricChannel::TypingSpeed => "typing_speed",
            BiometricChannel::SwipeVelocity => "swipe_velocity",
            BiometricChannel::PressurePattern => "pressure_pattern",
            BiometricChannel::DeviceAngle => "device_angle",
        }
    }
}

impl std::fmt::Display for BiometricChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Score Types
// ============================================================================

/// The fused verdict returned for every analyzed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudScore {
    /// Echoed transaction identifier.
    pub transaction_id: String,
    /// Fused fraud probability in [0, 1], rounded to 4 decimals.
    pub fraud_probability: f64,
    /// Supervised classifier sub-score in [0, 1], rounded to 4 decimals.
    pub ml_score: f64,
    /// Transaction-graph sub-score in [0, 1], rounded to 4 decimals.
    pub graph_score: f64,
    /// Behavioral biometric sub-score in [0, 1], rounded to 4 decimals.
    pub biometric_score: f64,
    /// True iff `fraud_probability` reached the configured threshold.
    pub is_fraudulent: bool,
    /// End-to-end scoring latency in milliseconds, rounded to 2 decimals.
    pub latency_ms: f64,
    /// Explanation, present iff the transaction was flagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Round to 4 decimal places, the precision of all returned sub-scores.
#[must_use]
pub fn round_score(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Round to 2 decimal places, the precision of the latency field.
#[must_use]
pub fn round_latency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// User History
// ============================================================================

/// Rolling per-user counters kept in the history cache.
///
/// `amount_velocity` counts consecutive transactions arriving less than an
/// hour apart; any larger gap resets it to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserHistory {
    /// Total transactions observed for this user while the entry lived.
    pub txn_count: u64,
    /// Device seen on the most recent transaction.
    pub last_device: Option<String>,
    /// IP address seen on the most recent transaction.
    pub last_ip: Option<String>,
    /// Whether the most recent transaction switched devices.
    pub device_changed: bool,
    /// Whether the most recent transaction switched IP addresses.
    pub ip_changed: bool,
    /// Consecutive sub-hour transaction streak length.
    pub amount_velocity: u32,
    /// Timestamp of the most recent transaction.
    pub last_txn_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_transaction() -> Transaction {
        Transaction {
            transaction_id: "TXN001".to_string(),
            sender_id: "USER001".to_string(),
            receiver_id: "USER002".to_string(),
            amount: 1000.0,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 14, 0, 0).unwrap(),
            device_id: "DEV001".to_string(),
            ip_address: "192.168.1.1".to_string(),
            biometric: None,
            metadata: None,
        }
    }

    #[test]
    fn test_validate_accepts_wellformed() {
        assert!(sample_transaction().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonpositive_amount() {
        let mut txn = sample_transaction();
        txn.amount = 0.0;
        assert!(txn.validate().is_err());
        txn.amount = -5.0;
        assert!(txn.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_ids() {
        let mut txn = sample_transaction();
        txn.sender_id.clear();
        assert!(txn.validate().is_err());
    }

    #[test]
    fn test_biometric_channel_access() {
        let sample = BiometricSample {
            typing_speed: Some(50.0),
            swipe_velocity: None,
            pressure_pattern: Some(0.5),
            device_angle: None,
        };

        assert_eq!(sample.channel(BiometricChannel::TypingSpeed), Some(50.0));
        assert_eq!(sample.channel(BiometricChannel::SwipeVelocity), None);
        assert_eq!(sample.channels().filter(|(_, v)| v.is_some()).count(), 2);
        assert!(!sample.is_empty());
        assert!(BiometricSample::default().is_empty());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_score(0.123_456), 0.1235);
        assert_eq!(round_score(0.999_96), 1.0);
        assert_eq!(round_latency(12.345), 12.35);
    }

    #[test]
    fn test_user_history_default_is_zeroed() {
        let history = UserHistory::default();
        assert_eq!(history.txn_count, 0);
        assert_eq!(history.amount_velocity, 0);
        assert!(!history.device_changed);
        assert!(!history.ip_changed);
        assert!(history.last_device.is_none());
        assert!(history.last_txn_time.is_none());
    }

    #[test]
    fn test_transaction_roundtrips_through_json() {
        let txn = sample_transaction();
        let json = serde_json::to_string(&txn).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transaction_id, txn.transaction_id);
        assert_eq!(back.timestamp, txn.timestamp);
    }
}
