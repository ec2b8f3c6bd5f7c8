//! In-memory TTL cache.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::cache::CacheStore;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Bytes,
    /// `None` when the TTL reaches past what the clock can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A thread-safe TTL cache keyed by normalized source URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // Expired (or absent): reclaim lazily.
        self.inner.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        if ttl.is_zero() {
            self.inner.remove(key);
            return;
        }
        self.inner.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    fn delete(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        metrics::record_cache_size(self.inner.len());
        removed
    }

    fn flush(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let after = self.inner.len();
        metrics::record_cache_size(after);
        before.saturating_sub(after)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Background task that periodically purges expired entries.
pub struct CacheSweeper {
    cache: Arc<dyn CacheStore>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: Arc<dyn CacheStore>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Cache sweeper starting");

        let Some(first_tick) = Instant::now().checked_add(self.interval) else {
            tracing::warn!(interval = ?self.interval, "Sweep interval out of range, relying on lazy expiry");
            return;
        };
        let mut ticker = time::interval_at(first_tick, self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = self.cache.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = self.cache.len(), "Expired cache entries purged");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
