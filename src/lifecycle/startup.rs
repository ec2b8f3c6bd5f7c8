//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (meta watcher, cache sweeper, render scheduler)
//! - Hand back an HTTP server ready to bind
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::browser::BrowserLauncher;
use crate::cache::{CacheStore, CacheSweeper, MemoryCache};
use crate::config::PrerenderConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::meta::{MetaError, MetaScriptRegistry, MetaScriptStore, MetaWatcher, NoMetaScripts};
use crate::render::{Prerenderer, RenderScheduler, RetryingFetcher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("meta scripts: {0}")]
    Meta(#[from] MetaError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully wired daemon, not yet serving.
pub struct App {
    server: HttpServer,
    prerenderer: Prerenderer,
    scheduler: JoinHandle<()>,
    sweeper: JoinHandle<()>,
    _meta_watcher: Option<MetaWatcher>,
}

/// Build every subsystem for `config`, launching browsers through `launcher`.
///
/// Must be called inside a Tokio runtime; background tasks start immediately
/// and stop when `shutdown` fires.
pub fn build_app(
    config: &PrerenderConfig,
    launcher: Arc<dyn BrowserLauncher>,
    shutdown: &Shutdown,
) -> Result<App, StartupError> {
    let (meta, meta_watcher): (Arc<dyn MetaScriptStore>, Option<MetaWatcher>) =
        match &config.meta.dir {
            Some(dir) => {
                let registry = Arc::new(MetaScriptRegistry::load(dir)?);
                let watcher = MetaWatcher::start(Arc::clone(&registry))?;
                (registry, Some(watcher))
            }
            None => {
                tracing::info!("No meta directory configured, injection disabled");
                (Arc::new(NoMetaScripts), None)
            }
        };

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let sweeper = CacheSweeper::new(
        Arc::clone(&cache),
        Duration::from_secs(config.cache.sweep_interval_secs),
    );
    let sweeper = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let fetcher = RetryingFetcher::new(Arc::clone(&meta));
    let (handle, scheduler) =
        RenderScheduler::spawn(launcher, fetcher, &config.scheduler, shutdown.subscribe());

    let prerenderer = Prerenderer::new(cache, handle);
    let server = HttpServer::new(AppState {
        prerenderer: prerenderer.clone(),
        defaults: config.render.clone(),
        meta,
    });

    tracing::info!(
        timeout_secs = config.render.timeout_secs,
        retries = config.render.retries,
        cache_ttl_secs = config.render.cache_ttl_secs,
        idle_secs = config.scheduler.idle_secs,
        strip_external = config.render.strip_external,
        "Subsystems initialized"
    );

    Ok(App {
        server,
        prerenderer,
        scheduler,
        sweeper,
        _meta_watcher: meta_watcher,
    })
}

impl App {
    pub fn prerenderer(&self) -> &Prerenderer {
        &self.prerenderer
    }

    /// Serve until `shutdown` fires, then wait for background tasks to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        self.server.run(listener, shutdown.subscribe()).await?;

        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "Render scheduler task failed");
        }
        if let Err(e) = self.sweeper.await {
            tracing::error!(error = %e, "Cache sweeper task failed");
        }
        Ok(())
    }
}
