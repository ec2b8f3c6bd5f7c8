//! Headless browser capability.
//!
//! # Data Flow
//! ```text
//! RenderScheduler
//!     → BrowserLauncher::launch (one expensive process per session)
//!     → BrowserSession (shared by every in-flight fetch)
//!         → NavigationContext (one tab per fetch attempt)
//!             → navigate → document_ready → evaluate meta → outer_html
//! ```
//!
//! # Design Decisions
//! - The browser is an opaque capability behind traits; the scheduler and
//!   fetcher never see the DevTools protocol
//! - Sessions are shared by reference (`Arc`), contexts are owned by one fetch
//! - `chromium.rs` is the production implementation; tests supply fakes

pub mod chromium;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use chromium::ChromiumLauncher;

/// Errors raised by the external browser capability.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// The browser process could not be started or connected to.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A new tab could not be opened on the session.
    #[error("failed to open navigation context: {0}")]
    Context(String),

    /// Navigation to the source URL failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Script evaluation failed inside the page.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The DOM could not be read back.
    #[error("DOM serialization failed: {0}")]
    Serialize(String),

    /// The session or context has already been closed.
    #[error("browser session closed")]
    Closed,
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError>;
}

/// One live browser process.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open an isolated navigation context (a tab).
    async fn new_context(&self) -> Result<Box<dyn NavigationContext>, BrowserError>;

    /// Terminate the browser process.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// An isolated tab used by exactly one fetch attempt.
#[async_trait]
pub trait NavigationContext: Send {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError>;

    /// Whether the loaded document has a root element.
    async fn document_ready(&mut self) -> Result<bool, BrowserError>;

    async fn evaluate(&mut self, script: &str) -> Result<(), BrowserError>;

    /// Serialized markup of the whole document.
    async fn outer_html(&mut self) -> Result<String, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}
