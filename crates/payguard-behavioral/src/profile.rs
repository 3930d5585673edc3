//! Biometric profile storage and deviation scoring.

use std::collections::{HashMap, VecDeque};

use payguard_core::types::{BiometricChannel, BiometricSample};

/// Maximum retained samples per channel.
pub const MAX_SAMPLES_PER_CHANNEL: usize = 100;

/// Minimum history before a channel contributes to the anomaly score.
pub const MIN_SAMPLES_FOR_SCORING: usize = 5;

/// Score returned when no baseline exists to compare against.
const UNKNOWN_USER_SCORE: f64 = 0.5;

/// One channel's sliding sample window.
#[derive(Debug, Clone, Default)]
struct ChannelWindow {
    samples: VecDeque<f64>,
}

impl ChannelWindow {
    fn push(&mut self, value: f64) {
        if self.samples.len() == MAX_SAMPLES_PER_CHANNEL {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    /// Population mean and standard deviation of the window.
    fn stats(&self) -> (f64, f64) {
        let n = self.samples.len() as f64;
        if n == 0.0 {
            return (0.0, 0.0);
        }
        let mean = self.samples.iter().sum::<f64>() / n;
        let variance = self
            .samples
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, variance.sqrt())
    }
}

#[derive(Debug, Clone, Default)]
struct UserProfile {
    windows: HashMap<BiometricChannel, ChannelWindow>,
}

/// Per-user rolling biometric baselines.
///
/// The profiler itself is a plain data structure; the engine wraps it in a
/// lock and enforces the score-then-observe ordering.
#[derive(Debug, Default)]
pub struct BiometricProfiler {
    profiles: HashMap<String, UserProfile>,
}

impl BiometricProfiler {
    /// Create an empty profiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sample into a user's baseline windows.
    ///
    /// Only channels present in the sample are appended; each window keeps
    /// the most recent [`MAX_SAMPLES_PER_CHANNEL`] values.
    pub fn observe(&mut self, user_id: &str, sample: &BiometricSample) {
        let profile = self.profiles.entry(user_id.to_string()).or_default();
        for (channel, value) in sample.channels() {
            if let Some(value) = value {
                profile.windows.entry(channel).or_default().push(value);
            }
        }
    }

    /// Anomaly score for a sample against the user's stored baseline.
    ///
    /// Returns 0.5 for unknown users and for samples where no channel has
    /// enough history; otherwise the mean of per-channel deviations.
    #[must_use]
    pub fn anomaly_score(&self, user_id: &str, sample: &BiometricSample) -> f64 {
        let Some(profile) = self.profiles.get(user_id) else {
            return UNKNOWN_USER_SCORE;
        };

        let mut deviations = Vec::new();
        for (channel, value) in sample.channels() {
            let Some(value) = value else { continue };
            let Some(window) = profile.windows.get(&channel) else {
                continue;
            };
            if window.len() < MIN_SAMPLES_FOR_SCORING {
                continue;
            }
            let (mean, std) = window.stats();
            deviations.push(deviation_score(value, mean, std));
        }

        if deviations.is_empty() {
            return UNKNOWN_USER_SCORE;
        }
        deviations.iter().sum::<f64>() / deviations.len() as f64
    }

    /// Number of stored samples for one of a user's channels.
    #[must_use]
    pub fn sample_count(&self, user_id: &str, channel: BiometricChannel) -> usize {
        self.profiles
            .get(user_id)
            .and_then(|p| p.windows.get(&channel))
            .map_or(0, ChannelWindow::len)
    }

    /// Number of users with at least one stored sample.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.profiles.len()
    }
}

/// Map a sample's deviation from the channel baseline onto [0, 1].
///
/// With a degenerate (zero-variance) baseline any value off the mean by at
/// least 0.01 is maximally anomalous. Otherwise the absolute z-score is
/// bucketed: beyond 3σ scores 0.95, beyond 2σ scores 0.75, beyond 1σ scores
/// 0.4, and anything within 1σ scores 0.1.
fn deviation_score(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        return if (value - mean).abs() < 0.01 { 0.0 } else { 1.0 };
    }

    let z = ((value - mean) / std).abs();
    if z > 3.0 {
        0.95
    } else if z > 2.0 {
        0.75
    } else if z > 1.0 {
        0.4
    } else {
        0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(typing: f64, swipe: f64, pressure: f64) -> BiometricSample {
        BiometricSample {
            typing_speed: Some(typing),
            swipe_velocity: Some(swipe),
            pressure_pattern: Some(pressure),
            device_angle: None,
        }
    }

    #[test]
    fn test_unknown_user_scores_neutral() {
        let profiler = BiometricProfiler::new();
        assert_eq!(
            profiler.anomaly_score("ghost", &sample(50.0, 100.0, 0.5)),
            0.5
        );
    }

    #[test]
    fn test_thin_history_scores_neutral() {
        let mut profiler = BiometricProfiler::new();
        for _ in 0..MIN_SAMPLES_FOR_SCORING - 1 {
            profiler.observe("USER001", &sample(50.0, 100.0, 0.5));
        }
        // Four samples everywhere: no channel qualifies yet.
        assert_eq!(
            profiler.anomaly_score("USER001", &sample(200.0, 500.0, 2.0)),
            0.5
        );
    }

    #[test]
    fn test_constant_baseline_is_all_or_nothing() {
        let mut profiler = BiometricProfiler::new();
        for _ in 0..10 {
            profiler.observe(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(50.0),
                    ..BiometricSample::default()
                },
            );
        }

        let on_mean = BiometricSample {
            typing_speed: Some(50.0),
            ..BiometricSample::default()
        };
        assert_eq!(profiler.anomaly_score("USER001", &on_mean), 0.0);

        let off_mean = BiometricSample {
            typing_speed: Some(50.02),
            ..BiometricSample::default()
        };
        assert_eq!(profiler.anomaly_score("USER001", &off_mean), 1.0);
    }

    #[test]
    fn test_anomalous_sample_scores_high() {
        let mut profiler = BiometricProfiler::new();
        for _ in 0..10 {
            profiler.observe("USER001", &sample(50.0, 100.0, 0.5));
        }

        let score = profiler.anomaly_score("USER001", &sample(200.0, 500.0, 2.0));
        assert!(score > 0.5, "score: {score}");
    }

    #[test]
    fn test_zscore_band_mapping() {
        // Baseline with non-trivial spread: mean 50, population std 5.
        let mut profiler = BiometricProfiler::new();
        for v in [45.0, 45.0, 50.0, 55.0, 55.0, 50.0, 45.0, 55.0] {
            profiler.observe(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(v),
                    ..BiometricSample::default()
                },
            );
        }

        let score_at = |v: f64| {
            profiler.anomaly_score(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(v),
                    ..BiometricSample::default()
                },
            )
        };

        assert_eq!(score_at(50.0), 0.1); // within 1 sigma
        assert_eq!(score_at(58.0), 0.4); // between 1 and 2 sigma
        assert_eq!(score_at(62.0), 0.75); // between 2 and 3 sigma
        assert_eq!(score_at(80.0), 0.95); // beyond 3 sigma
    }

    #[test]
    fn test_window_is_capped() {
        let mut profiler = BiometricProfiler::new();
        for i in 0..250 {
            profiler.observe(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(i as f64),
                    ..BiometricSample::default()
                },
            );
        }

        assert_eq!(
            profiler.sample_count("USER001", BiometricChannel::TypingSpeed),
            MAX_SAMPLES_PER_CHANNEL
        );
    }

    #[test]
    fn test_window_keeps_most_recent_samples() {
        let mut profiler = BiometricProfiler::new();
        for _ in 0..100 {
            profiler.observe(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(10.0),
                    ..BiometricSample::default()
                },
            );
        }
        // Overwrite the whole window with a new regime.
        for _ in 0..100 {
            profiler.observe(
                "USER001",
                &BiometricSample {
                    typing_speed: Some(90.0),
                    ..BiometricSample::default()
                },
            );
        }

        let on_new_regime = BiometricSample {
            typing_speed: Some(90.0),
            ..BiometricSample::default()
        };
        assert_eq!(profiler.anomaly_score("USER001", &on_new_regime), 0.0);
    }

    #[test]
    fn test_scoring_does_not_mutate_profile() {
        let mut profiler = BiometricProfiler::new();
        for _ in 0..10 {
            profiler.observe("USER001", &sample(50.0, 100.0, 0.5));
        }

        let before = profiler.sample_count("USER001", BiometricChannel::TypingSpeed);
        profiler.anomaly_score("USER001", &sample(200.0, 500.0, 2.0));
        let after = profiler.sample_count("USER001", BiometricChannel::TypingSpeed);
        assert_eq!(before, after);
    }
}
