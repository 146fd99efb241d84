//! Process-local expiring key/value cache.
//!
//! # Purpose
//! Memoizes derived authorization results (permission sets, visible menus,
//! the whole menu tree) keyed by a namespaced string.
//!
//! # Notes
//! - Reads take the shared lock only. An entry past its expiry is reported
//!   absent even before the sweeper removes it.
//! - A zero TTL stores the entry without expiry; it stays until deleted.
//! - The sweeper scans under the shared lock and takes the exclusive lock
//!   only to remove the keys it identified, re-checking each one.
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Cheaply clonable handle; clones share the same map.
#[derive(Debug)]
pub struct ExpiringCache<V> {
    name: &'static str,
    inner: Arc<RwLock<HashMap<String, Entry<V>>>>,
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// `name` labels the cache in metrics.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let guard = self.inner.read().await;
        let hit = guard
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone());
        let outcome = if hit.is_some() { "hit" } else { "miss" };
        metrics::counter!("warden_cache_lookups_total", "cache" => self.name, "outcome" => outcome)
            .increment(1);
        hit
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: expiry(ttl),
        };
        self.inner.write().await.insert(key.into(), entry);
    }

    /// Stores the entry only if `still_current` holds while the exclusive lock is held.
    ///
    /// Returns whether the entry was stored.
    pub async fn set_if(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
        still_current: impl FnOnce() -> bool,
    ) -> bool {
        let mut guard = self.inner.write().await;
        if !still_current() {
            return false;
        }
        guard.insert(
            key.into(),
            Entry {
                value,
                expires_at: expiry(ttl),
            },
        );
        true
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.remove(key).is_some()
    }

    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        before - guard.len()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Removes expired entries and returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        sweep(&self.inner, self.name).await
    }

    /// Spawns the periodic sweep. The task ends once every handle is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<RwLock<HashMap<String, Entry<V>>>> = Arc::downgrade(&self.inner);
        let name = self.name;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                sweep(&inner, name).await;
            }
        })
    }
}

fn expiry(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Some(Instant::now() + ttl)
    }
}

async fn sweep<V>(inner: &RwLock<HashMap<String, Entry<V>>>, name: &'static str) -> usize {
    let now = Instant::now();
    let expired: Vec<String> = {
        let guard = inner.read().await;
        guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    };
    if expired.is_empty() {
        return 0;
    }
    let mut guard = inner.write().await;
    let mut removed = 0;
    for key in expired {
        // The key may have been refreshed between the scan and the write lock.
        if guard.get(&key).is_some_and(|entry| entry.is_expired(now)) {
            guard.remove(&key);
            removed += 1;
        }
    }
    metrics::counter!("warden_cache_swept_total", "cache" => name).increment(removed as u64);
    tracing::debug!(cache = name, removed, "swept expired cache entries");
    removed
}
