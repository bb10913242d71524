//! In-process token store backed by a concurrent map.
//!
//! Used when the primary database is not the active backend, and by tests.
//! Contents do not survive a restart; users simply log in again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{TokenStore, TokenStoreError};
use crate::auth::clock::{Clock, SystemClock};

/// Interval between background evictions of expired entries.
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone)]
struct StoredToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Concurrent in-memory [`TokenStore`].
pub struct MemoryTokenStore {
    entries: DashMap<String, StoredToken>,
    clock: Arc<dyn Clock>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, live or not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, v| v.expires_at > now);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }

    fn is_live(&self, token: &StoredToken) -> bool {
        token.expires_at > self.clock.now()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TokenStoreError> {
        let stored = StoredToken {
            value: value.to_string(),
            expires_at: self.clock.now() + ttl,
        };
        self.entries.insert(key.to_string(), stored);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| self.is_live(entry.value()))
            .map(|entry| entry.value().value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, TokenStoreError> {
        // The entry guard holds the shard lock for the compare and the write.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if !self.is_live(current) || current.value != expected {
                    return Ok(false);
                }
                occupied.insert(StoredToken {
                    value: value.to_string(),
                    expires_at: self.clock.now() + ttl,
                });
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn remove_if(&self, key: &str, expected: &str) -> Result<bool, TokenStoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .remove_if(key, |_, v| v.expires_at > now && v.value == expected)
            .is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn store() -> (MemoryTokenStore, ManualClock) {
        let clock = ManualClock::default();
        (MemoryTokenStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let (store, _) = store();
        assert!(store.get("refresh_token:u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let (store, _) = store();
        store.set("k", "one", Duration::minutes(1)).await.unwrap();
        store.set("k", "two", Duration::minutes(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let (store, clock) = store();
        store.set("k", "v", Duration::seconds(10)).await.unwrap();
        clock.advance(Duration::seconds(10));
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.replace_if("k", "v", "w", Duration::seconds(10)).await.unwrap());
        assert!(!store.remove_if("k", "v").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (store, _) = store();
        store.set("k", "v", Duration::minutes(1)).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_if_only_swaps_matching_value() {
        let (store, _) = store();
        store.set("k", "old", Duration::minutes(1)).await.unwrap();
        assert!(!store.replace_if("k", "stale", "new", Duration::minutes(1)).await.unwrap());
        assert!(store.replace_if("k", "old", "new", Duration::minutes(1)).await.unwrap());
        assert!(!store.replace_if("k", "old", "newer", Duration::minutes(1)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn remove_if_consumes_once() {
        let (store, _) = store();
        store.set("k", "v", Duration::minutes(1)).await.unwrap();
        assert!(!store.remove_if("k", "other").await.unwrap());
        assert!(store.remove_if("k", "v").await.unwrap());
        assert!(!store.remove_if("k", "v").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_replace_has_one_winner() {
        let (store, _) = store();
        let store = Arc::new(store);
        store.set("k", "start", Duration::minutes(1)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .replace_if("k", "start", &format!("next-{i}"), Duration::minutes(1))
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn cleanup_evicts_expired() {
        let (store, clock) = store();
        store.set("short", "v", Duration::seconds(1)).await.unwrap();
        store.set("long", "v", Duration::minutes(10)).await.unwrap();
        clock.advance(Duration::seconds(5));
        store.cleanup();
        assert_eq!(store.len(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }
}
