//! Cache-fronted render entry point used by the HTTP layer.

use std::sync::Arc;

use bytes::Bytes;

use crate::cache::CacheStore;
use crate::observability::metrics;
use crate::render::scheduler::{SchedulerHandle, SchedulerStatus};
use crate::render::{cache_key_for, RenderError, RenderRequest};

/// How a response was produced, reported in the `x-cache-status` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Rendered and stored.
    Miss,
    /// Rendered with a zero TTL; nothing stored.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// Renders pages through the scheduler, caching results by source URL.
#[derive(Clone)]
pub struct Prerenderer {
    cache: Arc<dyn CacheStore>,
    scheduler: SchedulerHandle,
}

impl Prerenderer {
    pub fn new(cache: Arc<dyn CacheStore>, scheduler: SchedulerHandle) -> Self {
        Self { cache, scheduler }
    }

    pub async fn render(&self, request: RenderRequest) -> Result<(Bytes, CacheStatus), RenderError> {
        let key = request.cache_key().to_string();

        if let Some(html) = self.cache.get(&key) {
            metrics::record_cache_lookup(true);
            tracing::debug!(source = %key, "Cache hit");
            return Ok((html, CacheStatus::Hit));
        }
        metrics::record_cache_lookup(false);

        let ttl = request.cache_ttl;
        let html = self.scheduler.submit(request).await?;

        self.cache.set(&key, html.clone(), ttl);
        let status = if ttl.is_zero() {
            CacheStatus::Bypass
        } else {
            CacheStatus::Miss
        };
        Ok((html, status))
    }

    /// Drop one cached source, or everything when `source` is blank.
    pub fn invalidate(&self, source: &str) {
        if source.trim().is_empty() {
            self.cache.flush();
            tracing::info!("Cache flushed");
        } else {
            let key = cache_key_for(source);
            let removed = self.cache.delete(&key);
            tracing::info!(source = %key, removed, "Cache entry invalidated");
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.status()
    }
}
