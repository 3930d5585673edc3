//! Synthetic training data.
//!
//! Offline tooling for fitting the classifier: draws labeled feature
//! records from two regimes (legitimate and fraudulent) with the class
//! balance controlled by `fraud_ratio`. Never used on the request path.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Poisson};

use crate::features::FeatureVector;

/// A labeled sample for supervised fitting.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    /// Feature record.
    pub features: FeatureVector,
    /// Ground-truth label.
    pub is_fraud: bool,
}

/// Generate a shuffled, seeded training set.
///
/// Legitimate traffic: moderate lognormal amounts, business hours, low
/// counterparty counts, rare device/IP switches. Fraud: heavy-tailed
/// amounts, small-hours timing, elevated velocity, frequent switches.
#[must_use]
pub fn generate_training_data(
    n_samples: usize,
    fraud_ratio: f64,
    seed: u64,
) -> Vec<LabeledSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_fraud = (n_samples as f64 * fraud_ratio).round() as usize;
    let n_legit = n_samples.saturating_sub(n_fraud);

    let mut samples = Vec::with_capacity(n_samples);
    for _ in 0..n_legit {
        samples.push(LabeledSample {
            features: legit_features(&mut rng),
            is_fraud: false,
        });
    }
    for _ in 0..n_fraud {
        samples.push(LabeledSample {
            features: fraud_features(&mut rng),
            is_fraud: true,
        });
    }

    samples.shuffle(&mut rng);
    samples
}

/// Inverse-prevalence sample weights for an imbalanced label vector.
///
/// Positive samples are up-weighted by the inverse fraud rate so the fit is
/// not dominated by the legitimate majority. A degenerate all-negative or
/// all-positive set gets uniform weights.
#[must_use]
pub fn inverse_prevalence_weights(labels: &[bool]) -> Vec<f64> {
    let positives = labels.iter().filter(|&&l| l).count();
    if positives == 0 || positives == labels.len() {
        return vec![1.0; labels.len()];
    }
    let fraud_ratio = positives as f64 / labels.len() as f64;
    labels
        .iter()
        .map(|&l| if l { 1.0 / fraud_ratio } else { 1.0 })
        .collect()
}

fn legit_features(rng: &mut StdRng) -> FeatureVector {
    let amount = LogNormal::new(7.0, 1.5).expect("valid lognormal").sample(rng);
    FeatureVector {
        amount,
        hour: rng.random_range(8..22) as f64,
        day_of_week: rng.random_range(0..7) as f64,
        amount_log: amount.ln_1p(),
        sender_txn_count: Poisson::new(5.0).expect("valid poisson").sample(rng),
        receiver_txn_count: Poisson::new(5.0).expect("valid poisson").sample(rng),
        amount_velocity: Poisson::new(2.0).expect("valid poisson").sample(rng),
        device_change: if rng.random_bool(0.05) { 1.0 } else { 0.0 },
        ip_change: if rng.random_bool(0.10) { 1.0 } else { 0.0 },
    }
}

fn fraud_features(rng: &mut StdRng) -> FeatureVector {
    let amount = LogNormal::new(10.0, 1.0).expect("valid lognormal").sample(rng);
    FeatureVector {
        amount,
        hour: rng.random_range(0..6) as f64,
        day_of_week: rng.random_range(0..7) as f64,
        amount_log: amount.ln_1p(),
        sender_txn_count: Poisson::new(15.0).expect("valid poisson").sample(rng),
        receiver_txn_count: Poisson::new(15.0).expect("valid poisson").sample(rng),
        amount_velocity: Poisson::new(8.0).expect("valid poisson").sample(rng),
        device_change: if rng.random_bool(0.70) { 1.0 } else { 0.0 },
        ip_change: if rng.random_bool(0.80) { 1.0 } else { 0.0 },
    }
}
