use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use prerender::browser::ChromiumLauncher;
use prerender::config::loader::read_config;
use prerender::config::validation::validate_config;
use prerender::config::PrerenderConfig;
use prerender::lifecycle::{build_app, signals, Shutdown};
use prerender::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "prerender")]
#[command(about = "Headless browser prerendering daemon", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Listen address (overrides listener.bind_address)
    #[arg(long)]
    bind: Option<String>,

    /// Directory of meta injection scripts (overrides meta.dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strip scripts and stylesheets from rendered output
    #[arg(long)]
    external_resources: bool,

    /// Seconds a browser session may sit idle before it is closed
    #[arg(long)]
    idle_secs: Option<u64>,

    /// Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut PrerenderConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(dir) = self.config {
            config.meta.dir = Some(dir);
        }
        if self.external_resources {
            config.render.strip_external = true;
        }
        if let Some(idle) = self.idle_secs {
            config.scheduler.idle_secs = idle;
        }
        if let Some(chrome) = self.chrome {
            config.browser.executable = Some(chrome);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config_file {
        Some(path) => read_config(path)?,
        None => PrerenderConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "prerender starting");

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        meta_dir = ?config.meta.dir,
        strip_external = config.render.strip_external,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let app = build_app(&config, launcher, &shutdown)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_handler(shutdown.clone());
    app.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
