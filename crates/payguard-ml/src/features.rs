//! Feature extraction.
//!
//! The classifier consumes a fixed-shape record accessed by field, never by
//! position; [`FeatureVector::to_array`] preserves the canonical order for
//! artifact tooling.

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use payguard_core::types::{Transaction, UserHistory};

/// Feature identifiers, in canonical artifact order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    /// Raw transaction amount.
    Amount,
    /// Hour of day, 0-23.
    Hour,
    /// Day of week, Monday = 0.
    DayOfWeek,
    /// ln(1 + amount).
    AmountLog,
    /// Sender's cached transaction count.
    SenderTxnCount,
    /// Receiver's cached transaction count.
    ReceiverTxnCount,
    /// Sender's consecutive sub-hour transaction streak.
    AmountVelocity,
    /// 1.0 when the sender's device differs from the last one seen.
    DeviceChange,
    /// 1.0 when the sender's IP differs from the last one seen.
    IpChange,
}

impl FeatureName {
    /// All features, in canonical order.
    pub const ALL: [FeatureName; 9] = [
        FeatureName::Amount,
        FeatureName::Hour,
        FeatureName::DayOfWeek,
        FeatureName::AmountLog,
        FeatureName::SenderTxnCount,
        FeatureName::ReceiverTxnCount,
        FeatureName::AmountVelocity,
        FeatureName::DeviceChange,
        FeatureName::IpChange,
    ];
}

/// The fixed-shape feature record fed to the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Raw transaction amount.
    pub amount: f64,
    /// Hour of day, 0-23.
    pub hour: f64,
    /// Day of week, Monday = 0.
    pub day_of_week: f64,
    /// ln(1 + amount).
    pub amount_log: f64,
    /// Sender's cached transaction count.
    pub sender_txn_count: f64,
    /// Receiver's cached transaction count.
    pub receiver_txn_count: f64,
    /// Sender's consecutive sub-hour transaction streak.
    pub amount_velocity: f64,
    /// 1.0 when the sender switched devices.
    pub device_change: f64,
    /// 1.0 when the sender switched IP addresses.
    pub ip_change: f64,
}

impl FeatureVector {
    /// Value of a feature by name.
    #[must_use]
    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::Amount => self.amount,
            FeatureName::Hour => self.hour,
            FeatureName::DayOfWeek => self.day_of_week,
            FeatureName::AmountLog => self.amount_log,
            FeatureName::SenderTxnCount => self.sender_txn_count,
            FeatureName::ReceiverTxnCount => self.receiver_txn_count,
            FeatureName::AmountVelocity => self.amount_velocity,
            FeatureName::DeviceChange => self.device_change,
            FeatureName::IpChange => self.ip_change,
        }
    }

    /// The record flattened into canonical artifact order.
    #[must_use]
    pub fn to_array(&self) -> [f64; 9] {
        FeatureName::ALL.map(|name| self.get(name))
    }
}

/// Build the feature record for a transaction given both parties' cached
/// histories.
///
/// Device and IP change are evaluated against the sender's stored
/// `last_device`/`last_ip` at scoring time, so the second of two
/// back-to-back transactions from a new device scores the change even
/// though the cache has not been updated yet. A sender with no stored
/// history scores both as unchanged.
#[must_use]
pub fn extract_features(
    txn: &Transaction,
    sender: &UserHistory,
    receiver: &UserHistory,
) -> FeatureVector {
    let device_change = sender
        .last_device
        .as_deref()
        .is_some_and(|device| device != txn.device_id);
    let ip_change = sender
        .last_ip
        .as_deref()
        .is_some_and(|ip| ip != txn.ip_address);

    FeatureVector {
        amount: txn.amount,
        hour: f64::from(txn.timestamp.hour()),
        day_of_week: f64::from(txn.timestamp.weekday().num_days_from_monday()),
        amount_log: txn.amount.ln_1p(),
        sender_txn_count: sender.txn_count as f64,
        receiver_txn_count: receiver.txn_count as f64,
        amount_velocity: f64::from(sender.amount_velocity),
        device_change: if device_change { 1.0 } else { 0.0 },
        ip_change: if ip_change { 1.0 } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn txn_at(hour: u32) -> Transaction {
        Transaction {
            transaction_id: "TXN001".to_string(),
            sender_id: "USER001".to_string(),
            receiver_id: "USER002".to_string(),
            amount: 1000.0,
            // 2025-03-14 is a Friday.
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, hour, 30, 0).unwrap(),
            device_id: "DEV001".to_string(),
            ip_address: "10.0.0.1".to_string(),
            biometric: None,
            metadata: None,
        }
    }

    #[test]
    fn test_calendar_features() {
        let features = extract_features(
            &txn_at(14),
            &UserHistory::default(),
            &UserHistory::default(),
        );
        assert_eq!(features.hour, 14.0);
        assert_eq!(features.day_of_week, 4.0); // Friday, Monday = 0
        assert!((features.amount_log - 1001.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_no_history_means_no_change_flags() {
        let features = extract_features(
            &txn_at(14),
            &UserHistory::default(),
            &UserHistory::default(),
        );
        assert_eq!(features.device_change, 0.0);
        assert_eq!(features.ip_change, 0.0);
        assert_eq!(features.sender_txn_count, 0.0);
    }

    #[test]
    fn test_change_flags_compare_against_stored_last_seen() {
        let sender = UserHistory {
            txn_count: 1,
            last_device: Some("DEV000".to_string()),
            last_ip: Some("10.0.0.1".to_string()),
            ..UserHistory::default()
        };
        let features = extract_features(&txn_at(14), &sender, &UserHistory::default());
        assert_eq!(features.device_change, 1.0);
        assert_eq!(features.ip_change, 0.0);
    }

    #[test]
    fn test_array_order_matches_canonical_names() {
        let features = FeatureVector {
            amount: 1.0,
            hour: 2.0,
            day_of_week: 3.0,
            amount_log: 4.0,
            sender_txn_count: 5.0,
            receiver_txn_count: 6.0,
            amount_velocity: 7.0,
            device_change: 8.0,
            ip_change: 9.0,
        };
        assert_eq!(
            features.to_array(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }
}
