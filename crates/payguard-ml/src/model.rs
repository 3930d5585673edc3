//! The classifier seam and the heuristic fallback.

use std::path::Path;

use payguard_core::error::Result;

use crate::features::FeatureVector;
use crate::gbdt::GradientBoostedModel;

/// A binary fraud classifier producing a positive-class probability.
pub trait Classifier: Send + Sync {
    /// Probability that the transaction described by `features` is
    /// fraudulent, in [0, 1].
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Deterministic rule-based classifier.
///
/// Serves as the lower-bound reference and as the substitute whenever the
/// trained model is missing or faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heuristic;

impl Heuristic {
    /// Additive risk score: large amount, small-hours timing, a sub-hour
    /// transaction streak, and a device or IP switch each contribute.
    #[must_use]
    pub fn score(features: &FeatureVector) -> f64 {
        let mut score: f64 = 0.0;
        if features.amount > 50_000.0 {
            score += 0.3;
        }
        if features.hour < 5.0 {
            score += 0.2;
        }
        if features.amount_velocity > 5.0 {
            score += 0.3;
        }
        if features.device_change > 0.0 || features.ip_change > 0.0 {
            score += 0.2;
        }
        score.min(1.0)
    }
}

impl Classifier for Heuristic {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        Ok(Self::score(features))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// The scoring entry point owned by the engine.
///
/// Wraps whichever classifier was selected at startup and guarantees a
/// usable score: a classifier fault or non-finite output falls back to the
/// heuristic with a warning.
pub struct Scorer {
    classifier: Box<dyn Classifier>,
}

impl Scorer {
    /// Scorer backed by the heuristic alone.
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            classifier: Box::new(Heuristic),
        }
    }

    /// Scorer backed by a trained model loaded from a JSON artifact.
    ///
    /// A malformed artifact is a startup error, not a silent fallback.
    pub fn from_artifact(path: &Path) -> Result<Self> {
        let model = GradientBoostedModel::load(path)?;
        Ok(Self {
            classifier: Box::new(model),
        })
    }

    /// Scorer over an explicit classifier (mainly for tests).
    #[must_use]
    pub fn with_classifier(classifier: Box<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Name of the active classifier.
    #[must_use]
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Fraud probability for the given features, always in [0, 1].
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        match self.classifier.predict(features) {
            Ok(p) if p.is_finite() => p.clamp(0.0, 1.0),
            Ok(p) => {
                tracing::warn!(
                    model = self.classifier.name(),
                    output = p,
                    "non-finite classifier output, using heuristic"
                );
                Heuristic::score(features)
            }
            Err(err) => {
                tracing::warn!(
                    model = self.classifier.name(),
                    %err,
                    "inference fault, using heuristic"
                );
                Heuristic::score(features)
            }
        }
    }
}
