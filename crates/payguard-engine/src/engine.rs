//! The fraud scoring orchestrator.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use payguard_behavioral::BiometricProfiler;
use payguard_cache::{CacheConfig, HistoryCache, DEFAULT_COUNT_WINDOW};
use payguard_core::config::EngineConfig;
use payguard_core::error::Result;
use payguard_core::types::{round_latency, round_score, FraudScore, Transaction};
use payguard_graph::{RingAssessment, TransactionGraph};
use payguard_ml::{extract_features, Scorer};

use crate::monitor::{EngineStats, StatsSnapshot};

/// Substitute when the ML detector times out or faults.
const ML_DEFAULT_SCORE: f64 = 0.5;
/// Substitute when the biometric detector times out or faults.
const BIOMETRIC_DEFAULT_SCORE: f64 = 0.5;
/// Sub-score level above which a detector contributes to the explanation.
const REASON_SUBSCORE_THRESHOLD: f64 = 0.7;

/// The ensemble fraud scoring engine.
///
/// Owns the transaction graph, the biometric profiles and the history
/// cache; weights, threshold and deadlines are frozen at construction.
pub struct FraudEngine {
    config: EngineConfig,
    cache: Arc<HistoryCache>,
    graph: Arc<RwLock<TransactionGraph>>,
    profiler: Arc<RwLock<BiometricProfiler>>,
    scorer: Arc<Scorer>,
    stats: Arc<EngineStats>,
}

impl FraudEngine {
    /// Construct an engine: validate the configuration, load the optional
    /// classifier artifact and probe the cache backend once.
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let scorer = match &config.model_path {
            Some(path) => Scorer::from_artifact(path)?,
            None => Scorer::heuristic(),
        };

        let cache = HistoryCache::connect(&CacheConfig::from(&config)).await;
        let graph = TransactionGraph::new(config.graph_window_hours, config.min_ring_size);

        tracing::info!(
            classifier = scorer.classifier_name(),
            remote_cache = cache.is_remote(),
            threshold = config.fraud_threshold,
            "fraud engine ready"
        );

        Ok(Self {
            config,
            cache: Arc::new(cache),
            graph: Arc::new(RwLock::new(graph)),
            profiler: Arc::new(RwLock::new(BiometricProfiler::new())),
            scorer: Arc::new(scorer),
            stats: Arc::new(EngineStats::new()),
        })
    }

    /// Score a transaction.
    ///
    /// The three detectors run concurrently, each collected under its own
    /// deadline; a timeout or fault substitutes that detector's default and
    /// the orphaned task is aborted. History and profile updates land after
    /// scoring so they cannot influence the current call. Never fails for a
    /// syntactically valid transaction.
    pub async fn analyze(&self, txn: Transaction) -> FraudScore {
        let start = Instant::now();

        let ml_handle = tokio::spawn(ml_analysis(
            Arc::clone(&self.cache),
            Arc::clone(&self.scorer),
            txn.clone(),
        ));
        let graph_handle = tokio::spawn(graph_analysis(Arc::clone(&self.graph), txn.clone()));
        let biometric_handle = tokio::spawn(biometric_analysis(
            Arc::clone(&self.profiler),
            txn.clone(),
        ));

        let (ml_score, graph_assessment, biometric_score) = tokio::join!(
            collect(
                "ml",
                ml_handle,
                self.config.ml_timeout,
                ML_DEFAULT_SCORE
            ),
            collect(
                "graph",
                graph_handle,
                self.config.graph_timeout,
                RingAssessment::default()
            ),
            collect(
                "biometric",
                biometric_handle,
                self.config.biometric_timeout,
                BIOMETRIC_DEFAULT_SCORE
            ),
        );
        let graph_score = graph_assessment.score;

        let fused = self.config.ml_weight * ml_score
            + self.config.graph_weight * graph_score
            + self.config.biometric_weight * biometric_score;
        let fraud_probability = round_score(fused);
        let is_fraudulent = fraud_probability >= self.config.fraud_threshold;

        let latency_ms = round_latency(start.elapsed().as_secs_f64() * 1000.0);

        // Post-scoring state updates; the detectors for this call have
        // already read their inputs.
        self.cache.update_user_history(&txn.sender_id, &txn).await;
        self.cache.update_user_history(&txn.receiver_id, &txn).await;
        self.cache
            .increment_transaction_count(&txn.sender_id, DEFAULT_COUNT_WINDOW)
            .await;

        let reason = is_fraudulent.then(|| {
            build_reason(ml_score, graph_score, biometric_score)
        });

        if !graph_assessment.ring.is_empty() {
            tracing::warn!(
                transaction_id = %txn.transaction_id,
                members = ?graph_assessment.ring,
                "fraud ring detected"
            );
        }

        self.stats.record(&txn.transaction_id, latency_ms, is_fraudulent);
        if is_fraudulent {
            tracing::warn!(
                transaction_id = %txn.transaction_id,
                probability = fraud_probability,
                latency_ms,
                "transaction flagged"
            );
        } else {
            tracing::debug!(
                transaction_id = %txn.transaction_id,
                probability = fraud_probability,
                latency_ms,
                "transaction scored"
            );
        }

        FraudScore {
            transaction_id: txn.transaction_id,
            fraud_probability,
            ml_score: round_score(ml_score),
            graph_score: round_score(graph_score),
            biometric_score: round_score(biometric_score),
            is_fraudulent,
            latency_ms,
            reason,
        }
    }

    /// The history cache selected at startup.
    #[must_use]
    pub fn cache(&self) -> &HistoryCache {
        &self.cache
    }

    /// Running totals since engine start.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Await a detector under its deadline, substituting `default` on timeout,
/// panic or internal fault. Timed-out tasks are aborted; a task that slips
/// past the abort only touches state through its own locks, so a late
/// completion cannot corrupt anything.
async fn collect<T>(
    name: &'static str,
    mut handle: JoinHandle<Result<T>>,
    deadline: Duration,
    default: T,
) -> T {
    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(Ok(value))) => value,
        Ok(Ok(Err(err))) => {
            tracing::warn!(detector = name, %err, "detector fault, using default");
            default
        }
        Ok(Err(join_err)) => {
            tracing::warn!(detector = name, %join_err, "detector task died, using default");
            default
        }
        Err(_) => {
            handle.abort();
            tracing::warn!(
                detector = name,
                timeout_ms = deadline.as_millis() as u64,
                "detector deadline exceeded, using default"
            );
            default
        }
    }
}

async fn ml_analysis(
    cache: Arc<HistoryCache>,
    scorer: Arc<Scorer>,
    txn: Transaction,
) -> Result<f64> {
    let sender = cache.user_history(&txn.sender_id).await;
    let receiver = cache.user_history(&txn.receiver_id).await;
    let features = extract_features(&txn, &sender, &receiver);
    Ok(scorer.predict(&features))
}

async fn graph_analysis(
    graph: Arc<RwLock<TransactionGraph>>,
    txn: Transaction,
) -> Result<RingAssessment> {
    // Insertion (with its window sweep) and assessment happen under one
    // write guard: other readers see either neither or both.
    let mut guard = graph.write();
    guard.record(&txn.sender_id, &txn.receiver_id, txn.amount, txn.timestamp);
    Ok(guard.assess(&txn.sender_id, &txn.receiver_id))
}

async fn biometric_analysis(
    profiler: Arc<RwLock<BiometricProfiler>>,
    txn: Transaction,
) -> Result<f64> {
    let Some(sample) = txn.biometric else {
        return Ok(BIOMETRIC_DEFAULT_SCORE);
    };

    // Score against the profile as it stood on entry, then fold the sample
    // in so it cannot mask its own deviation.
    let score = profiler.read().anomaly_score(&txn.sender_id, &sample);
    profiler.write().observe(&txn.sender_id, &sample);
    Ok(score)
}

fn build_reason(ml_score: f64, graph_score: f64, biometric_score: f64) -> String {
    let mut reasons = Vec::new();
    if ml_score > REASON_SUBSCORE_THRESHOLD {
        reasons.push("High ML risk score");
    }
    if graph_score > REASON_SUBSCORE_THRESHOLD {
        reasons.push("Fraud ring detected");
    }
    if biometric_score > REASON_SUBSCORE_THRESHOLD {
        reasons.push("Biometric anomaly");
    }

    if reasons.is_empty() {
        "Multiple risk factors".to_string()
    } else {
        reasons.join("; ")
    }
}
