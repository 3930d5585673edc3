//! # Payguard Engine
//!
//! The ensemble fraud scoring orchestrator. Each transaction fans out to
//! three concurrent detectors (supervised classifier, transaction graph,
//! behavioral biometrics), each collected under its own deadline; results
//! are fused by fixed weights into a verdict. Detector faults and timeouts
//! degrade to per-detector defaults, so the scoring call is total.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
pub mod monitor;

pub use engine::FraudEngine;
pub use monitor::{EngineStats, StatsSnapshot};
