//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (add or keep request ID)
//!     → server.rs (route, parse query / body)
//!     → render::Prerenderer (cache, scheduler)
//!     → response.rs (HTML + cache header, or error status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use response::X_CACHE_STATUS;
pub use server::{AppState, HttpServer};
