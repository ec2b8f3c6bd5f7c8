//! Render orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! Prerenderer::render(RenderRequest)
//!     → CacheStore::get                      (hit: done)
//!     → SchedulerHandle::submit              (bounded queue)
//!         → RenderScheduler loop             (owns the BrowserSession)
//!             → spawned fetch task per request
//!                 → RetryingFetcher::fetch   (deadline + retry budget)
//!                     → navigate, meta injection, serialize, strip
//!     → CacheStore::set
//! ```
//!
//! # Design Decisions
//! - One scheduling loop orders every session lifecycle transition
//! - Fetches run concurrently, each in its own navigation context
//! - Retries live in the fetcher, never in the scheduler
//! - A single deadline spans all attempts of one request

pub mod fetcher;
pub mod scheduler;
pub mod service;
pub mod strip;

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::browser::BrowserError;
use crate::config::{RenderDefaults, MAX_CACHE_TTL_SECS};

pub use fetcher::RetryingFetcher;
pub use scheduler::{RenderScheduler, SchedulerHandle, SchedulerStatus};
pub use service::{CacheStatus, Prerenderer};

/// Outcome of one render.
pub type RenderResult = Result<Bytes, RenderError>;

/// Errors surfaced by the render pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed request; never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request's deadline elapsed before any attempt succeeded.
    #[error("render deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The page loaded but had no document element.
    #[error("document is empty")]
    EmptyDocument,

    /// Navigation or serialization failed.
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] BrowserError),

    /// The browser session could not be started.
    #[error("browser session allocation failed: {0}")]
    SessionAllocationFailed(BrowserError),

    /// The scheduler has stopped accepting work.
    #[error("render scheduler is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RenderError {
    /// Client-class errors are the caller's fault and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RenderError::InvalidInput(_))
    }

    /// Errors the fetcher may retry within the budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RenderError::EmptyDocument | RenderError::FetchFailed(_))
    }
}

/// One render job. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Absolute page URL; also the cache key.
    pub source: Url,
    /// Deadline spanning every attempt.
    pub timeout: Duration,
    /// Retries after the first attempt (`0` means exactly one attempt).
    pub retry_budget: u32,
    /// Cache lifetime of the result; zero means no-store.
    pub cache_ttl: Duration,
    /// Remove scripts and stylesheets from the output.
    pub strip_external: bool,
}

impl RenderRequest {
    /// Build a request from raw parameters, filling gaps from `defaults`.
    ///
    /// A negative `cache_secs` is treated as zero (no-store); one past
    /// [`MAX_CACHE_TTL_SECS`] is rejected.
    pub fn from_params(
        source: &str,
        timeout_secs: Option<u64>,
        retries: Option<u32>,
        cache_secs: Option<i64>,
        defaults: &RenderDefaults,
    ) -> Result<Self, RenderError> {
        let source = parse_source(source)?;

        let timeout_secs = timeout_secs.unwrap_or(defaults.timeout_secs);
        if timeout_secs == 0 {
            return Err(RenderError::InvalidInput("timeout must be at least 1 second".into()));
        }

        let cache_secs = cache_secs
            .map(|secs| secs.max(0) as u64)
            .unwrap_or(defaults.cache_ttl_secs);
        if cache_secs > MAX_CACHE_TTL_SECS {
            return Err(RenderError::InvalidInput(format!(
                "cache must be at most {MAX_CACHE_TTL_SECS} seconds"
            )));
        }

        Ok(Self {
            source,
            timeout: Duration::from_secs(timeout_secs),
            retry_budget: retries.unwrap_or(defaults.retries),
            cache_ttl: Duration::from_secs(cache_secs),
            strip_external: defaults.strip_external,
        })
    }

    /// Normalized cache key for this request.
    pub fn cache_key(&self) -> &str {
        self.source.as_str()
    }

    /// Total attempts the fetcher may make.
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget.saturating_add(1)
    }
}

/// Parse an absolute URL with a host.
pub fn parse_source(source: &str) -> Result<Url, RenderError> {
    if source.trim().is_empty() {
        return Err(RenderError::InvalidInput("source is required".into()));
    }
    let url = Url::parse(source.trim())
        .map_err(|e| RenderError::InvalidInput(format!("invalid source url: {e}")))?;
    if !url.has_host() {
        return Err(RenderError::InvalidInput(
            "invalid source url: must be absolute with a host".into(),
        ));
    }
    Ok(url)
}

/// Normalize a URL for use as a cache key, falling back to the raw string.
pub fn cache_key_for(source: &str) -> String {
    match Url::parse(source.trim()) {
        Ok(url) => url.to_string(),
        Err(_) => source.to_string(),
    }
}
