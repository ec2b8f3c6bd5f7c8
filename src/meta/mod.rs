//! Meta injection subsystem.
//!
//! # Data Flow
//! ```text
//! startup:   full walk of meta dir → registry.rs (one script per directory)
//! runtime:   notify event → watcher.rs → registry reload/remove
//! render:    URL path → scripts_for → ["/" script, exact-path script]
//!            → evaluated in the page before serialization
//! ```
//!
//! # Design Decisions
//! - Entries are replaced wholesale on reload, never merged
//! - Reads and writes go through one `RwLock`; a reload is never seen half-done
//! - The wildcard `/` script and an exact-path script both apply, wildcard first

pub mod registry;
pub mod template;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub use registry::MetaScriptRegistry;
pub use watcher::MetaWatcher;

/// Key of the wildcard script applied to every page.
pub const ROOT_KEY: &str = "/";

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is outside the meta root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Read side of a meta script backend.
pub trait MetaScriptStore: Send + Sync {
    /// Exact-key lookup.
    fn lookup(&self, path_key: &str) -> Option<Arc<str>>;

    /// Number of scripts currently held.
    fn len(&self) -> usize;

    /// Scripts to inject for a request path, wildcard first.
    fn scripts_for(&self, url_path: &str) -> Vec<Arc<str>> {
        let key = normalize_path(url_path);
        let mut scripts = Vec::with_capacity(2);
        if let Some(root) = self.lookup(ROOT_KEY) {
            scripts.push(root);
        }
        if key != ROOT_KEY {
            if let Some(exact) = self.lookup(key) {
                scripts.push(exact);
            }
        }
        scripts
    }
}

/// Strip a trailing `/` so `/blog/` and `/blog` share a key.
pub fn normalize_path(url_path: &str) -> &str {
    let trimmed = url_path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_KEY
    } else {
        trimmed
    }
}

/// A store with no scripts, used when no meta directory is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetaScripts;

impl MetaScriptStore for NoMetaScripts {
    fn lookup(&self, _path_key: &str) -> Option<Arc<str>> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}
