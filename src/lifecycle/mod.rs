//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → meta registry + watcher → cache + sweeper → scheduler → HTTP server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → abort renders, close browser → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Every background task subscribes to one broadcast shutdown channel

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_app, App, StartupError};
