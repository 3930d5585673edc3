//! # Payguard ML
//!
//! Supervised fraud scoring:
//! - Fixed-shape feature extraction from a transaction plus cached history
//! - A polymorphic classifier seam with two variants: a trained
//!   gradient-boosted tree ensemble loaded from a JSON artifact, and a
//!   deterministic heuristic
//! - Synthetic training-data generation for offline fitting
//!
//! Inference never fails the request: any classifier fault degrades to the
//! heuristic score.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod features;
pub mod gbdt;
pub mod model;
pub mod synth;

pub use features::{extract_features, FeatureName, FeatureVector};
pub use gbdt::GradientBoostedModel;
pub use model::{Classifier, Heuristic, Scorer};
