//! Shared utilities for end-to-end tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use prerender::browser::{BrowserError, BrowserLauncher, BrowserSession, NavigationContext};
use prerender::config::PrerenderConfig;
use prerender::lifecycle::{build_app, Shutdown, StartupError};

/// Start a programmable fixture server; returns its address and a hit counter.
pub async fn start_fixture<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while read < buf.len() {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

/// Start a fixture that always answers 200 with `html`.
pub async fn start_static_fixture(html: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    start_fixture(move || async move { (200, html.to_string()) }).await
}

/// Browser stand-in that fetches pages over plain HTTP.
///
/// Every navigation is redirected to `fixture`, whatever host the source
/// names, so `https://example.test/` lands on the local fixture server.
pub struct HttpFetchLauncher {
    fixture: SocketAddr,
    client: reqwest::Client,
    pub launches: AtomicUsize,
    pub evaluated: Mutex<Vec<String>>,
}

impl HttpFetchLauncher {
    pub fn new(fixture: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            fixture,
            client: reqwest::Client::new(),
            launches: AtomicUsize::new(0),
            evaluated: Mutex::new(Vec::new()),
        })
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }
}

struct Launcher(Arc<HttpFetchLauncher>);

#[async_trait]
impl BrowserLauncher for Launcher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError> {
        self.0.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Session(self.0.clone())))
    }
}

struct Session(Arc<HttpFetchLauncher>);

#[async_trait]
impl BrowserSession for Session {
    async fn new_context(&self) -> Result<Box<dyn NavigationContext>, BrowserError> {
        Ok(Box::new(Context {
            browser: self.0.clone(),
            body: String::new(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

struct Context {
    browser: Arc<HttpFetchLauncher>,
    body: String,
}

#[async_trait]
impl NavigationContext for Context {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        let mut target = url.clone();
        let _ = target.set_scheme("http");
        let _ = target.set_ip_host(self.browser.fixture.ip());
        let _ = target.set_port(Some(self.browser.fixture.port()));

        let navigation_error = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        let res = self
            .browser
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        if !res.status().is_success() {
            return Err(navigation_error(format!("status {}", res.status())));
        }
        self.body = res.text().await.map_err(|e| navigation_error(e.to_string()))?;
        Ok(())
    }

    async fn document_ready(&mut self) -> Result<bool, BrowserError> {
        Ok(!self.body.trim().is_empty())
    }

    async fn evaluate(&mut self, script: &str) -> Result<(), BrowserError> {
        self.browser.evaluated.lock().unwrap().push(script.to_string());
        Ok(())
    }

    async fn outer_html(&mut self) -> Result<String, BrowserError> {
        Ok(self.body.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// A daemon serving on an ephemeral port.
pub struct Daemon {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), StartupError>>,
}

impl Daemon {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_daemon(config: PrerenderConfig, browser: Arc<HttpFetchLauncher>) -> Daemon {
    let shutdown = Shutdown::new();
    let app = build_app(&config, Arc::new(Launcher(browser)), &shutdown).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serve_shutdown = shutdown.clone();
    let task = tokio::spawn(async move { app.serve(listener, &serve_shutdown).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    Daemon { addr, shutdown, task }
}
