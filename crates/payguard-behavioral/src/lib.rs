//! # Payguard Behavioral
//!
//! Per-user behavioral biometric profiling:
//! - Sliding sample windows for four behavioral channels
//! - Anomaly scoring of an incoming sample against the stored baseline
//!
//! Scoring is read-only over the profile as it stood on entry; the current
//! sample is folded in afterwards so it cannot mask its own deviation.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod profile;

pub use profile::{BiometricProfiler, MAX_SAMPLES_PER_CHANNEL, MIN_SAMPLES_FOR_SCORING};
