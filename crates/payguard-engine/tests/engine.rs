//! End-to-end scenario tests for the fraud engine.
//!
//! Every engine here runs on the in-process cache: the testing preset
//! points the probe at a closed local port, so construction falls back
//! immediately and the tests never need a live backend.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

use payguard_core::config::EngineConfig;
use payguard_core::types::{BiometricSample, Transaction};
use payguard_engine::FraudEngine;

fn afternoon() -> DateTime<Utc> {
    // A fixed weekday afternoon keeps the heuristic's small-hours term out
    // of the picture regardless of when the suite runs.
    Utc.with_ymd_and_hms(2025, 3, 14, 14, 0, 0).unwrap()
}

fn txn(id: &str, sender: &str, receiver: &str, amount: f64) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        amount,
        timestamp: afternoon(),
        device_id: format!("DEV-{sender}"),
        ip_address: "192.168.1.1".to_string(),
        biometric: None,
        metadata: None,
    }
}

async fn engine() -> FraudEngine {
    FraudEngine::connect(EngineConfig::testing())
        .await
        .expect("testing config must construct")
}

fn assert_scores_in_unit_interval(score: &payguard_core::types::FraudScore) {
    for (name, value) in [
        ("fraud_probability", score.fraud_probability),
        ("ml_score", score.ml_score),
        ("graph_score", score.graph_score),
        ("biometric_score", score.biometric_score),
    ] {
        assert!((0.0..=1.0).contains(&value), "{name} out of range: {value}");
    }
    assert!(score.latency_ms >= 0.0);
}

#[tokio::test]
async fn test_testing_engine_uses_in_process_cache() {
    let engine = engine().await;
    assert!(!engine.cache().is_remote());
}

#[tokio::test]
async fn test_normal_low_amount_transaction() {
    let engine = engine().await;
    let score = engine
        .analyze(txn("TXN001", "USER001", "USER002", 1000.0))
        .await;

    assert_scores_in_unit_interval(&score);
    assert!(score.latency_ms < 500.0);
    assert!(score.fraud_probability < 0.7);
    assert!(!score.is_fraudulent);
    assert!(score.reason.is_none());
    assert_eq!(score.transaction_id, "TXN001");

    // Fresh state: ml and graph contribute nothing, the missing biometric
    // block contributes its 0.5 default.
    assert_eq!(score.ml_score, 0.0);
    assert_eq!(score.graph_score, 0.0);
    assert_eq!(score.biometric_score, 0.5);
    assert!((score.fraud_probability - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_high_amount_raises_ml_score() {
    let engine = engine().await;
    let score = engine
        .analyze(txn("TXN002", "USER003", "USER004", 100_000.0))
        .await;

    assert!(score.ml_score >= 0.3, "ml_score: {}", score.ml_score);
    assert!(!score.is_fraudulent);
}

#[tokio::test]
async fn test_fraud_ring_detection() {
    let engine = engine().await;

    // USER0 -> USER1 -> USER2 -> USER3 -> USER4 -> USER0
    for i in 0..5 {
        let sender = format!("USER{i}");
        let receiver = format!("USER{}", (i + 1) % 5);
        engine
            .analyze(txn(&format!("TXN{i}"), &sender, &receiver, 5000.0))
            .await;
    }

    let score = engine
        .analyze(txn("TXN_FINAL", "USER0", "USER1", 5000.0))
        .await;

    assert!(score.graph_score > 0.0);
    assert_eq!(score.graph_score, 0.9);
}

#[tokio::test]
async fn test_velocity_burst_raises_graph_score() {
    let engine = engine().await;
    let now = Utc::now();

    let mut last = None;
    for i in 0..15 {
        let mut t = txn(
            &format!("TXN_V{i}"),
            "USER_BURST",
            &format!("USER_R{i}"),
            200.0,
        );
        // Velocity is judged against the wall clock, so the burst has to
        // actually be recent.
        t.timestamp = now + chrono::Duration::seconds(i);
        last = Some(engine.analyze(t).await);
    }

    let score = last.unwrap();
    assert!(score.graph_score > 0.3, "graph_score: {}", score.graph_score);
}

#[tokio::test]
async fn test_biometric_anomaly_detection() {
    let engine = engine().await;

    let baseline = BiometricSample {
        typing_speed: Some(50.0),
        swipe_velocity: Some(100.0),
        pressure_pattern: Some(0.5),
        device_angle: None,
    };
    for i in 0..10 {
        let mut t = txn(&format!("TXN_B{i}"), "USER_BIO", &format!("USER_{i}"), 1000.0);
        t.biometric = Some(baseline.clone());
        engine.analyze(t).await;
    }

    let mut anomalous = txn("TXN_ANOMALY", "USER_BIO", "USER_TARGET", 1000.0);
    anomalous.biometric = Some(BiometricSample {
        typing_speed: Some(200.0),
        swipe_velocity: Some(500.0),
        pressure_pattern: Some(2.0),
        device_angle: None,
    });
    let score = engine.analyze(anomalous).await;

    assert!(
        score.biometric_score > 0.5,
        "biometric_score: {}",
        score.biometric_score
    );
}

#[tokio::test]
async fn test_missing_biometric_scores_neutral() {
    let engine = engine().await;
    let score = engine
        .analyze(txn("TXN003", "USER005", "USER006", 500.0))
        .await;
    assert_eq!(score.biometric_score, 0.5);
}

#[tokio::test]
async fn test_device_change_feeds_the_classifier() {
    let engine = engine().await;

    engine
        .analyze(txn("TXN_D1", "USER_DC", "USER_X", 1000.0))
        .await;

    let mut second = txn("TXN_D2", "USER_DC", "USER_X", 1000.0);
    second.device_id = "DEV-OTHER".to_string();
    let score = engine.analyze(second).await;

    assert!(score.ml_score >= 0.2, "ml_score: {}", score.ml_score);
}

#[tokio::test]
async fn test_all_detectors_timing_out_yields_default_fusion() {
    let config = EngineConfig {
        ml_timeout: Duration::from_nanos(1),
        graph_timeout: Duration::from_nanos(1),
        biometric_timeout: Duration::from_nanos(1),
        ..EngineConfig::testing()
    };
    let engine = FraudEngine::connect(config).await.unwrap();

    let score = engine
        .analyze(txn("TXN_TIMEOUT", "USER001", "USER002", 1000.0))
        .await;

    // 0.5 * 0.5 + 0.3 * 0.0 + 0.2 * 0.5 = 0.35
    assert_eq!(score.ml_score, 0.5);
    assert_eq!(score.graph_score, 0.0);
    assert_eq!(score.biometric_score, 0.5);
    assert!((score.fraud_probability - 0.35).abs() < 1e-9);
    assert!(!score.is_fraudulent);
}

#[tokio::test]
async fn test_fusion_respects_configured_weights() {
    let config = EngineConfig::builder()
        .weights(0.4, 0.4, 0.2)
        .cache_endpoint("127.0.0.1", 1)
        .build()
        .unwrap();
    let engine = FraudEngine::connect(config).await.unwrap();

    let score = engine
        .analyze(txn("TXN_W", "USER_W1", "USER_W2", 1000.0))
        .await;

    // ml 0.0, graph 0.0, biometric default 0.5.
    assert!((score.fraud_probability - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_verdict_matches_threshold_and_names_the_ring() {
    let config = EngineConfig {
        fraud_threshold: 0.3,
        ..EngineConfig::testing()
    };
    let engine = FraudEngine::connect(config).await.unwrap();

    for i in 0..5 {
        let sender = format!("USER{i}");
        let receiver = format!("USER{}", (i + 1) % 5);
        engine
            .analyze(txn(&format!("TXN{i}"), &sender, &receiver, 5000.0))
            .await;
    }
    let score = engine
        .analyze(txn("TXN_FINAL", "USER0", "USER1", 5000.0))
        .await;

    assert!(score.fraud_probability >= 0.3);
    assert!(score.is_fraudulent);
    assert_eq!(score.reason.as_deref(), Some("Fraud ring detected"));
}

#[tokio::test]
async fn test_reason_falls_back_without_dominant_subscore() {
    let config = EngineConfig {
        fraud_threshold: 0.2,
        ..EngineConfig::testing()
    };
    let engine = FraudEngine::connect(config).await.unwrap();

    // ml 0.3 (amount), graph 0.0, biometric 0.5: fused 0.25 crosses the
    // lowered threshold with no sub-score above 0.7.
    let score = engine
        .analyze(txn("TXN_MRF", "USER_M1", "USER_M2", 100_000.0))
        .await;

    assert!(score.is_fraudulent);
    assert_eq!(score.reason.as_deref(), Some("Multiple risk factors"));
}

#[tokio::test]
async fn test_verdict_agrees_with_returned_probability() {
    let engine = engine().await;
    for i in 0..10 {
        let score = engine
            .analyze(txn(
                &format!("TXN_A{i}"),
                &format!("USER_A{i}"),
                "USER_SINK",
                75_000.0,
            ))
            .await;
        assert_eq!(
            score.is_fraudulent,
            score.fraud_probability >= 0.7,
            "verdict and probability disagree: {score:?}"
        );
        assert_scores_in_unit_interval(&score);
    }
}

#[tokio::test]
async fn test_stats_track_scored_transactions() {
    let engine = engine().await;
    for i in 0..3 {
        engine
            .analyze(txn(&format!("TXN_S{i}"), "USER_S1", "USER_S2", 1000.0))
            .await;
    }

    let stats = engine.stats();
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.fraud_detected, 0);
    assert!(stats.avg_latency_ms >= 0.0);
}

#[tokio::test]
async fn test_history_accumulates_across_calls() {
    let engine = engine().await;
    engine
        .analyze(txn("TXN_H1", "USER_H1", "USER_H2", 1000.0))
        .await;
    engine
        .analyze(txn("TXN_H2", "USER_H1", "USER_H2", 1000.0))
        .await;

    let history = engine.cache().user_history("USER_H1").await;
    assert_eq!(history.txn_count, 2);
    assert_eq!(history.last_device.as_deref(), Some("DEV-USER_H1"));

    // Receiver history is updated too.
    let receiver = engine.cache().user_history("USER_H2").await;
    assert_eq!(receiver.txn_count, 2);
}
