//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → PrerenderConfig (validated, immutable)
//!     → handed by value to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only meta scripts hot-reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::BrowserConfig;
pub use schema::CacheConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::MetaConfig;
pub use schema::ObservabilityConfig;
pub use schema::PrerenderConfig;
pub use schema::RenderDefaults;
pub use schema::SchedulerConfig;
pub use schema::{MAX_CACHE_TTL_SECS, MAX_IDLE_SECS, MAX_SWEEP_INTERVAL_SECS};
