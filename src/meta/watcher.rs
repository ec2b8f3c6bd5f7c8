//! Meta directory watcher for hot reload.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::meta::registry::{is_marker, MetaScriptRegistry};
use crate::meta::MetaError;

/// Keeps the registry in sync with its directory until dropped.
pub struct MetaWatcher {
    _watcher: RecommendedWatcher,
}

impl MetaWatcher {
    /// Start watching the registry's root recursively.
    pub fn start(registry: Arc<MetaScriptRegistry>) -> Result<Self, MetaError> {
        let root = registry.root().to_path_buf();
        let target = Arc::clone(&registry);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => apply_event(&target, &event),
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(path = ?root, "Meta watcher started");
        Ok(Self { _watcher: watcher })
    }
}

/// Apply one file-system notification to the registry.
pub fn apply_event(registry: &MetaScriptRegistry, event: &Event) {
    if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
        return;
    }

    for path in event.paths.iter().filter(|p| is_marker(p)) {
        sync_path(registry, path);
    }
}

fn sync_path(registry: &MetaScriptRegistry, path: &Path) {
    // Renames arrive as modify events; the file's presence decides the outcome.
    let result = if path.is_file() {
        registry.reload(path)
    } else {
        registry.remove(path).map(|_| ())
    };

    match result {
        Ok(()) => tracing::info!(file = ?path, "Meta script change applied"),
        Err(e) => tracing::error!(
            "Failed to apply meta change: {}. Keeping current scripts.",
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaScriptStore;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind, RemoveKind};
    use std::fs;

    #[test]
    fn test_events_reload_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MetaScriptRegistry::load(dir.path()).unwrap();
        let file = registry.root().join("meta.html");

        fs::write(&file, "<meta name=\"a\">").unwrap();
        apply_event(
            &registry,
            &Event::new(EventKind::Create(CreateKind::File)).add_path(file.clone()),
        );
        assert!(registry.lookup("/").unwrap().contains("\\\"a\\\""));

        fs::write(&file, "<meta name=\"b\">").unwrap();
        apply_event(
            &registry,
            &Event::new(EventKind::Modify(ModifyKind::Any)).add_path(file.clone()),
        );
        assert!(registry.lookup("/").unwrap().contains("\\\"b\\\""));

        fs::remove_file(&file).unwrap();
        apply_event(
            &registry,
            &Event::new(EventKind::Remove(RemoveKind::File)).add_path(file),
        );
        assert!(registry.lookup("/").is_none());
    }

    #[test]
    fn test_ignores_non_markers_and_access() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MetaScriptRegistry::load(dir.path()).unwrap();
        let notes = registry.root().join("notes.txt");
        let marker = registry.root().join("meta.html");
        fs::write(&notes, "x").unwrap();
        fs::write(&marker, "<meta>").unwrap();

        apply_event(
            &registry,
            &Event::new(EventKind::Create(CreateKind::File)).add_path(notes),
        );
        apply_event(
            &registry,
            &Event::new(EventKind::Access(AccessKind::Any)).add_path(marker),
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_watcher_picks_up_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(MetaScriptRegistry::load(dir.path()).unwrap());
        let _watcher = MetaWatcher::start(Arc::clone(&registry)).unwrap();

        let nested = registry.root().join("blog");
        fs::create_dir_all(&nested).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(nested.join("meta.html"), "<meta name=\"blog\">").unwrap();

        let mut found = false;
        for _ in 0..50 {
            if registry.lookup("/blog").is_some() {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(found, "watcher should register the new marker file");
    }
}
