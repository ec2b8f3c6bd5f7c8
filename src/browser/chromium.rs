//! Chromium implementation of the browser capability over the DevTools protocol.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, NavigationContext};
use crate::config::BrowserConfig;

const DOCUMENT_READY: &str = "document.documentElement !== null";

/// Launches one headless Chrome process per session.
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn cdp_config(&self) -> Result<CdpBrowserConfig, BrowserError> {
        let mut builder = CdpBrowserConfig::builder();
        if !self.config.headless {
            builder = builder.with_head();
        }
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &self.config.args {
            builder = builder.arg(arg.as_str());
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError> {
        let (browser, mut handler) = Browser::launch(self.cdp_config()?)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler stream must be polled for the connection to make progress.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "DevTools handler stopped");
                    break;
                }
            }
        });

        tracing::info!("Chromium session launched");

        Ok(Arc::new(ChromiumSession {
            browser: Mutex::new(browser),
            events,
        }))
    }
}

struct ChromiumSession {
    browser: Mutex<Browser>,
    events: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_context(&self) -> Result<Box<dyn NavigationContext>, BrowserError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?;
        Ok(Box::new(ChromiumContext { page: Some(page) }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Launch(e.to_string()));
        if let Err(e) = browser.wait().await {
            tracing::warn!(error = %e, "Chromium process did not exit cleanly");
        }
        self.events.abort();
        closed
    }
}

struct ChromiumContext {
    page: Option<Page>,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }
}

#[async_trait]
impl NavigationContext for ChromiumContext {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        self.page()?
            .goto(url.as_str())
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn document_ready(&mut self) -> Result<bool, BrowserError> {
        let result = self
            .page()?
            .evaluate(DOCUMENT_READY.to_string())
            .await
            .map_err(|e| BrowserError::Serialize(e.to_string()))?;
        result
            .into_value::<bool>()
            .map_err(|e| BrowserError::Serialize(e.to_string()))
    }

    async fn evaluate(&mut self, script: &str) -> Result<(), BrowserError> {
        self.page()?
            .evaluate(script.to_string())
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn outer_html(&mut self) -> Result<String, BrowserError> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::Serialize(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::Context(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        // A cancelled fetch drops its context mid-navigation; close the tab anyway.
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!(error = %e, "Failed to close abandoned tab");
                    }
                });
            }
        }
    }
}
