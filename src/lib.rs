//! Prerender daemon library.
//!
//! Renders JavaScript-heavy pages in a shared headless browser and serves the
//! resulting HTML, cached by source URL.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /prerender ──▶ http ──▶ render::Prerenderer ──▶ cache (hit) ──▶ HTML
//!                                        │
//!                                        ▼ (miss)
//!                                render::RenderScheduler ── one browser session,
//!                                        │                  recycled when idle
//!                                        ▼
//!                                render::RetryingFetcher ── deadline + retries,
//!                                        │                  meta injection, strip
//!                                        ▼
//!                                  browser (Chromium)
//!
//!     meta dir ──(notify)──▶ meta::MetaScriptRegistry
//!     DELETE /prerender ──▶ cache delete / flush
//! ```

// Core subsystems
pub mod browser;
pub mod cache;
pub mod config;
pub mod http;
pub mod meta;
pub mod render;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::PrerenderConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use render::{Prerenderer, RenderError, RenderRequest};
