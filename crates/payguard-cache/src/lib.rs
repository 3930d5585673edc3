//! # Payguard Cache
//!
//! Per-user rolling history for the fraud scoring engine: transaction
//! counters, device/IP change flags, short-window velocity and last-seen
//! timestamps.
//!
//! The primary backend is Redis, probed once at startup with a bounded
//! connect timeout. If the probe fails the cache permanently falls back to
//! an in-process store with the same semantics; it never attempts to switch
//! back mid-run. Transient backend faults at request time are treated as
//! cache misses, not as a reason to change backends.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod store;

use std::time::Duration;

use payguard_core::config::EngineConfig;
use payguard_core::types::{Transaction, UserHistory};

use crate::memory::MemoryStore;
use crate::store::{HistoryStore, RedisStore};

/// Default rolling-counter window (60 minutes).
pub const DEFAULT_COUNT_WINDOW: Duration = Duration::from_secs(3600);

/// Cache connection settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Remote backend host.
    pub host: String,
    /// Remote backend port.
    pub port: u16,
    /// TTL applied to history entries.
    pub ttl: Duration,
    /// Bound on the startup reachability probe.
    pub probe_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            ttl: Duration::from_secs(3600),
            probe_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&EngineConfig> for CacheConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            host: config.cache_host.clone(),
            port: config.cache_port,
            ttl: config.cache_ttl,
            probe_timeout: config.cache_probe_timeout,
        }
    }
}

/// The user history cache.
///
/// Reads never fail: a backend fault degrades to the default (empty)
/// history with a warning, so scoring proceeds on conservative inputs.
pub struct HistoryCache {
    store: Box<dyn HistoryStore>,
    ttl: Duration,
    remote: bool,
}

impl HistoryCache {
    /// Connect to the configured backend, falling back to the in-process
    /// store when the reachability probe fails. The choice is permanent for
    /// the engine lifetime.
    pub async fn connect(config: &CacheConfig) -> Self {
        match RedisStore::connect(&config.host, config.port, config.probe_timeout).await {
            Ok(store) => {
                tracing::info!(
                    host = %config.host,
                    port = config.port,
                    "history cache backed by redis"
                );
                Self {
                    store: Box::new(store),
                    ttl: config.ttl,
                    remote: true,
                }
            }
            Err(err) => {
                tracing::warn!(
                    host = %config.host,
                    port = config.port,
                    %err,
                    "cache backend unreachable, using in-process store"
                );
                Self::in_memory(config.ttl)
            }
        }
    }

    /// Build a cache over the in-process store directly.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            ttl,
            remote: false,
        }
    }

    /// Whether the remote backend was selected at startup.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Stored history for a user, or the default entry when absent.
    pub async fn user_history(&self, user_id: &str) -> UserHistory {
        match self.store.fetch_history(user_id).await {
            Ok(Some(history)) => history,
            Ok(None) => UserHistory::default(),
            Err(err) => {
                tracing::warn!(user_id, %err, "history fetch failed, treating as miss");
                UserHistory::default()
            }
        }
    }

    /// Fold a transaction into a user's history and write it back.
    ///
    /// Change flags compare against the previously stored device/IP; a user
    /// with no prior entry gets both flags false. Velocity counts
    /// consecutive transactions under an hour apart and resets on any larger
    /// gap. The write refreshes the entry TTL.
    pub async fn update_user_history(&self, user_id: &str, txn: &Transaction) -> UserHistory {
        let mut history = self.user_history(user_id).await;

        history.device_changed = history
            .last_device
            .as_deref()
            .is_some_and(|device| device != txn.device_id);
        history.ip_changed = history
            .last_ip
            .as_deref()
            .is_some_and(|ip| ip != txn.ip_address);
        history.last_device = Some(txn.device_id.clone());
        history.last_ip = Some(txn.ip_address.clone());

        if let Some(last) = history.last_txn_time {
            if txn.timestamp.signed_duration_since(last) < chrono::Duration::minutes(60) {
                history.amount_velocity += 1;
            } else {
                history.amount_velocity = 0;
            }
        }

        history.txn_count += 1;
        history.last_txn_time = Some(txn.timestamp);

        if let Err(err) = self.store.store_history(user_id, &history, self.ttl).await {
            tracing::warn!(user_id, %err, "history write failed");
        }

        history
    }

    /// Rolling transaction count for a user within the counter window.
    pub async fn transaction_count(&self, user_id: &str) -> u64 {
        match self.store.fetch_window_count(user_id).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(user_id, %err, "counter fetch failed, treating as zero");
                0
            }
        }
    }

    /// Atomically bump the rolling transaction counter, resetting its window.
    pub async fn increment_transaction_count(&self, user_id: &str, window: Duration) {
        if let Err(err) = self.store.bump_window_count(user_id, window).await {
            tracing::warn!(user_id, %err, "counter bump failed");
        }
    }
}
