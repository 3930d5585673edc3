//! The history store abstraction and its Redis implementation.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use payguard_core::error::{EngineError, Result};
use payguard_core::types::UserHistory;

/// Key for a user's rolling history entry.
pub(crate) fn history_key(user_id: &str) -> String {
    format!("user:{user_id}:history")
}

/// Key for a user's windowed transaction counter.
pub(crate) fn window_key(user_id: &str) -> String {
    format!("user:{user_id}:txn_window")
}

/// Backend contract for user history storage.
///
/// Implementations must be safe under concurrent calls from multiple request
/// handlers; [`HistoryStore::bump_window_count`] in particular must be atomic
/// (no read-modify-write).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch the stored history entry for a user, if any.
    async fn fetch_history(&self, user_id: &str) -> Result<Option<UserHistory>>;

    /// Write a user's history entry, resetting its TTL.
    async fn store_history(
        &self,
        user_id: &str,
        history: &UserHistory,
        ttl: Duration,
    ) -> Result<()>;

    /// Fetch the windowed transaction counter for a user.
    async fn fetch_window_count(&self, user_id: &str) -> Result<u64>;

    /// Atomically increment the windowed counter and reset its TTL.
    async fn bump_window_count(&self, user_id: &str, window: Duration) -> Result<()>;
}

/// Redis-backed history store.
///
/// History entries are JSON values written with `SET .. EX`; the windowed
/// counter uses an atomic `INCR` + `EXPIRE` pipeline, mirroring what the
/// counter semantics require.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis and verify liveness with a PING, both bounded by
    /// `probe_timeout`.
    pub async fn connect(host: &str, port: u16, probe_timeout: Duration) -> Result<Self> {
        let url = format!("redis://{host}:{port}/");
        let client = redis::Client::open(url)
            .map_err(|e| EngineError::CacheUnavailable(e.to_string()))?;

        let mut conn = tokio::time::timeout(
            probe_timeout,
            client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| {
            EngineError::CacheUnavailable(format!("connect to {host}:{port} timed out"))
        })?
        .map_err(|e| EngineError::CacheUnavailable(e.to_string()))?;

        let probe = async {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        };
        tokio::time::timeout(probe_timeout, probe)
            .await
            .map_err(|_| EngineError::CacheUnavailable("PING timed out".to_string()))?
            .map_err(|e| EngineError::CacheUnavailable(e.to_string()))?;

        Ok(Self { conn })
    }
}

fn request_err(err: redis::RedisError) -> EngineError {
    EngineError::cache(err.to_string())
}

#[async_trait]
impl HistoryStore for RedisStore {
    async fn fetch_history(&self, user_id: &str) -> Result<Option<UserHistory>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(history_key(user_id))
            .await
            .map_err(request_err)?;

        match raw {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).map_err(|e| EngineError::cache(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn store_history(
        &self,
        user_id: &str,
        history: &UserHistory,
        ttl: Duration,
    ) -> Result<()> {
        let json = serde_json::to_string(history)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(history_key(user_id), json, ttl.as_secs())
            .await
            .map_err(request_err)?;
        Ok(())
    }

    async fn fetch_window_count(&self, user_id: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn
            .get(window_key(user_id))
            .await
            .map_err(request_err)?;
        Ok(count.unwrap_or(0))
    }

    async fn bump_window_count(&self, user_id: &str, window: Duration) -> Result<()> {
        let key = window_key(user_id);
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .ignore()
            .expire(&key, window.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(request_err)?;
        Ok(())
    }
}
