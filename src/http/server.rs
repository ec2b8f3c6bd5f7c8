//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Translate query parameters into render requests
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::RenderDefaults;
use crate::http::request::{RequestIdExt, RequestIdLayer};
use crate::http::response::{html_response, status_for};
use crate::meta::MetaScriptStore;
use crate::observability::metrics;
use crate::render::{Prerenderer, RenderError, RenderRequest, SchedulerStatus};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub prerenderer: Prerenderer,
    pub defaults: RenderDefaults,
    pub meta: Arc<dyn MetaScriptStore>,
}

/// Query string of `GET /prerender`.
#[derive(Debug, Default, Deserialize)]
pub struct PrerenderQuery {
    #[serde(default)]
    pub source: String,
    pub timeout: Option<u64>,
    pub repeat: Option<u32>,
    pub cache: Option<i64>,
}

/// Body of `DELETE /prerender`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InvalidateBody {
    #[serde(default)]
    pub source: String,
}

/// Body of `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    pub status: String,
    pub cache_entries: usize,
    pub meta_scripts: usize,
    pub session_active: bool,
}

/// HTTP front end of the prerender daemon.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/prerender", get(prerender_handler).delete(invalidate_handler))
            .route("/health", get(health_handler))
            .route("/status", get(status_handler))
            .with_state(state)
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request.headers().request_id(),
                    )
                }),
            )
            .layer(RequestIdLayer)
    }

    /// Router for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain open requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn prerender_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PrerenderQuery>, QueryRejection>,
) -> Response {
    let start = Instant::now();

    let response = match render(&state, query).await {
        Ok(response) => response,
        Err(error) => {
            if error.is_client_error() {
                tracing::warn!(request_id = %headers.request_id(), error = %error, "Render rejected");
            } else {
                tracing::error!(
                    request_id = %headers.request_id(),
                    status = status_for(&error).as_u16(),
                    error = %error,
                    "Render failed"
                );
            }
            error.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn render(
    state: &AppState,
    query: Result<Query<PrerenderQuery>, QueryRejection>,
) -> Result<Response, RenderError> {
    let Query(query) = query.map_err(|e| RenderError::InvalidInput(e.body_text()))?;

    let request = RenderRequest::from_params(
        &query.source,
        query.timeout,
        query.repeat,
        query.cache,
        &state.defaults,
    )?;

    tracing::debug!(
        source = %request.source,
        timeout_secs = request.timeout.as_secs(),
        retries = request.retry_budget,
        "Render requested"
    );

    let (html, cache) = state.prerenderer.render(request).await?;
    Ok(html_response(html, cache))
}

async fn invalidate_handler(
    State(state): State<AppState>,
    body: Result<Json<InvalidateBody>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => {
            state.prerenderer.invalidate(&body.source);
            StatusCode::OK.into_response()
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Invalid invalidation body");
            (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusReport> {
    let status = state.prerenderer.scheduler_status();
    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: match status {
            SchedulerStatus::ShuttingDown => "shutting_down",
            _ => "ok",
        }
        .to_string(),
        cache_entries: state.prerenderer.cache().len(),
        meta_scripts: state.meta.len(),
        session_active: status == SchedulerStatus::SessionActive,
    })
}
