//! In-process fallback store.
//!
//! Selected when the Redis probe fails at startup. Matches the remote
//! store's observable semantics: entries expire after their TTL (discarded
//! lazily on read) and counter bumps reset the window, so a backend switch
//! is invisible to the engine.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use payguard_core::error::Result;
use payguard_core::types::UserHistory;

use crate::store::{history_key, window_key, HistoryStore};

#[derive(Debug, Clone)]
struct HistoryEntry {
    history: UserHistory,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Maps {
    histories: HashMap<String, HistoryEntry>,
    counters: HashMap<String, CounterEntry>,
}

/// Process-local history store.
///
/// A single mutex guards both maps; the counter bump is a single critical
/// section, which makes it atomic with respect to concurrent handlers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    maps: Mutex<Maps>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn fetch_history(&self, user_id: &str) -> Result<Option<UserHistory>> {
        let key = history_key(user_id);
        let mut maps = self.maps.lock();
        match maps.histories.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                Ok(Some(entry.history.clone()))
            }
            Some(_) => {
                maps.histories.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn store_history(
        &self,
        user_id: &str,
        history: &UserHistory,
        ttl: Duration,
    ) -> Result<()> {
        let entry = HistoryEntry {
            history: history.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.maps.lock().histories.insert(history_key(user_id), entry);
        Ok(())
    }

    async fn fetch_window_count(&self, user_id: &str) -> Result<u64> {
        let key = window_key(user_id);
        let mut maps = self.maps.lock();
        match maps.counters.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(entry.count),
            Some(_) => {
                maps.counters.remove(&key);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn bump_window_count(&self, user_id: &str, window: Duration) -> Result<()> {
        let key = window_key(user_id);
        let now = Instant::now();
        let mut maps = self.maps.lock();
        let count = match maps.counters.get(&key) {
            Some(entry) if entry.expires_at > now => entry.count + 1,
            _ => 1,
        };
        maps.counters.insert(
            key,
            CounterEntry {
                count,
                expires_at: now + window,
            },
        );
        Ok(())
    }
}
