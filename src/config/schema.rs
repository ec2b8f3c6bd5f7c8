//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the prerender
//! daemon. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest cache TTL accepted from configuration or a request (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Longest idle period before a browser session is recycled (one week).
pub const MAX_IDLE_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest interval between cache sweeps (thirty days).
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// Root configuration for the prerender daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PrerenderConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Defaults applied to render requests that omit a parameter.
    pub render: RenderDefaults,

    /// Browser session scheduling.
    pub scheduler: SchedulerConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Meta injection scripts.
    pub meta: MetaConfig,

    /// Headless browser launch settings.
    pub browser: BrowserConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9009").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9009".to_string(),
        }
    }
}

/// Render parameter defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Deadline spanning every attempt of one render, in seconds.
    pub timeout_secs: u64,

    /// Retries after the first failed attempt.
    pub retries: u32,

    /// How long a rendered page stays cached, in seconds. Zero disables caching.
    pub cache_ttl_secs: u64,

    /// Remove `<script>` and stylesheet `<link>` elements from the output.
    pub strip_external: bool,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 1,
            cache_ttl_secs: 8 * 60 * 60,
            strip_external: false,
        }
    }
}

/// Browser session scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds without activity before the browser session is destroyed.
    pub idle_secs: u64,

    /// Capacity of the submission queue in front of the scheduler.
    pub queue_depth: usize,
}

impl SchedulerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_secs: 30,
            queue_depth: 64,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between background sweeps of expired entries, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 12 * 60 * 60,
        }
    }
}

/// Meta injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MetaConfig {
    /// Directory watched recursively for `*.html` marker files.
    pub dir: Option<PathBuf>,
}

/// Headless browser configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to the Chrome/Chromium executable. Autodetected when unset.
    pub executable: Option<PathBuf>,

    /// Run without a visible window.
    pub headless: bool,

    /// Pass `--no-sandbox` (required inside most containers).
    pub no_sandbox: bool,

    /// Extra command-line arguments for the browser process.
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            no_sandbox: false,
            args: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
