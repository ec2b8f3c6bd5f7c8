//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! GET /prerender
//!     → CacheStore::get(source)        (hit: respond immediately)
//!     → scheduler render
//!     → CacheStore::set(source, html, ttl)
//!
//! DELETE /prerender
//!     → delete(source) | flush()
//!
//! background:
//!     CacheSweeper → purge_expired() every sweep interval
//! ```
//!
//! # Design Decisions
//! - Expiry is checked on read; the sweeper only reclaims memory
//! - A zero TTL means no-store and evicts any previous entry for the key
//! - `CacheStore` is the seam for alternate backends

pub mod memory;

use std::time::Duration;

use bytes::Bytes;

pub use memory::{CacheSweeper, MemoryCache};

/// A TTL key/value store for rendered pages.
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry. Expired entries are never returned.
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` for `ttl`. A zero `ttl` stores nothing and evicts `key`.
    fn set(&self, key: &str, value: Bytes, ttl: Duration);

    /// Remove one key. Returns whether it was present.
    fn delete(&self, key: &str) -> bool;

    /// Remove every key.
    fn flush(&self);

    /// Drop expired entries, returning how many were removed.
    fn purge_expired(&self) -> usize;

    /// Number of stored entries, including expired ones not yet purged.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
