//! Path-keyed registry of meta injection scripts.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::meta::template::render_script;
use crate::meta::{MetaError, MetaScriptStore, ROOT_KEY};
use crate::observability::metrics;

/// Meta scripts built from a directory of `*.html` marker files.
///
/// A marker file at `<root>/blog/post-1/meta.html` provides the script for
/// URL path `/blog/post-1`; a marker directly under `<root>` provides the
/// wildcard script for `/`.
#[derive(Debug)]
pub struct MetaScriptRegistry {
    root: PathBuf,
    scripts: RwLock<HashMap<String, Arc<str>>>,
}

impl MetaScriptRegistry {
    /// Create an empty registry rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scripts: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry and populate it from a full walk of `root`.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, MetaError> {
        let root = root.into();
        // File-system events report absolute paths.
        let root = root.canonicalize().unwrap_or(root);
        let registry = Self::new(root);
        let mut files = Vec::new();
        collect_markers(&registry.root, &mut files)?;
        files.sort();
        for file in &files {
            registry.reload(file)?;
        }
        tracing::info!(root = ?registry.root, scripts = registry.len(), "Meta scripts loaded");
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rebuild the entry for the directory containing `file`, replacing any previous script.
    pub fn reload(&self, file: &Path) -> Result<(), MetaError> {
        let key = self.key_for(file)?;
        let markup = fs::read_to_string(file).map_err(|source| MetaError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let script: Arc<str> = render_script(&markup).into();

        let count = {
            let mut scripts = self.scripts.write().unwrap_or_else(PoisonError::into_inner);
            scripts.insert(key.clone(), script);
            scripts.len()
        };
        metrics::record_meta_scripts(count);
        tracing::debug!(path_key = %key, file = ?file, "Meta script reloaded");
        Ok(())
    }

    /// Forget `file`. If other markers remain in its directory, the key is
    /// rebuilt from the one a full load would pick (last in sorted order);
    /// otherwise the key is dropped. Returns whether the key was dropped.
    pub fn remove(&self, file: &Path) -> Result<bool, MetaError> {
        let key = self.key_for(file)?;
        let dir = file.parent().unwrap_or(Path::new(""));
        if let Some(survivor) = sibling_markers(dir, file).pop() {
            tracing::debug!(path_key = %key, survivor = ?survivor, "Meta marker removed, sibling takes over");
            self.reload(&survivor)?;
            return Ok(false);
        }

        let (removed, count) = {
            let mut scripts = self.scripts.write().unwrap_or_else(PoisonError::into_inner);
            let removed = scripts.remove(&key).is_some();
            (removed, scripts.len())
        };
        if removed {
            metrics::record_meta_scripts(count);
            tracing::debug!(path_key = %key, "Meta script removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.scripts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_for(&self, file: &Path) -> Result<String, MetaError> {
        let dir = file.parent().unwrap_or(Path::new(""));
        path_key(&self.root, dir)
    }
}

impl MetaScriptStore for MetaScriptRegistry {
    fn lookup(&self, path_key: &str) -> Option<Arc<str>> {
        self.scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path_key)
            .cloned()
    }

    fn len(&self) -> usize {
        MetaScriptRegistry::len(self)
    }
}

/// Map a marker file's directory to its URL path key.
///
/// `root` itself maps to `/`; `root/blog/post-1` maps to `/blog/post-1`.
pub fn path_key(root: &Path, dir: &Path) -> Result<String, MetaError> {
    let relative = dir.strip_prefix(root).map_err(|_| MetaError::OutsideRoot {
        path: dir.to_path_buf(),
        root: root.to_path_buf(),
    })?;

    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        Ok(ROOT_KEY.to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}

/// Whether a path names a marker file.
pub fn is_marker(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

/// Marker files directly in `dir`, other than `excluded`, sorted.
fn sibling_markers(dir: &Path, excluded: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path != excluded && path.is_file() && is_marker(path))
        .collect();
    files.sort();
    files
}

fn collect_markers(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), MetaError> {
    let entries = fs::read_dir(dir).map_err(|source| MetaError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MetaError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_markers(&path, files)?;
        } else if is_marker(&path) {
            files.push(path);
        }
    }
    Ok(())
}
