//! Timeout- and retry-bounded page fetch.
//!
//! # Responsibilities
//! - Navigate a fresh context per attempt and serialize the document
//! - Inject the meta scripts matching the request path
//! - Retry immediately (no backoff) within the request's retry budget
//! - Enforce one deadline across all attempts
//! - Optionally strip external resources from the final markup

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use crate::browser::{BrowserSession, NavigationContext};
use crate::meta::MetaScriptStore;
use crate::observability::metrics;
use crate::render::strip::strip_external_resources;
use crate::render::{RenderError, RenderRequest, RenderResult};

/// Produces HTML for one request against a live session.
#[derive(Clone)]
pub struct RetryingFetcher {
    meta: Arc<dyn MetaScriptStore>,
}

impl RetryingFetcher {
    pub fn new(meta: Arc<dyn MetaScriptStore>) -> Self {
        Self { meta }
    }

    /// Render `request.source`, retrying up to `request.retry_budget` times.
    ///
    /// Elapsing the deadline always yields [`RenderError::DeadlineExceeded`],
    /// whatever attempt was in flight.
    pub async fn fetch(&self, session: &dyn BrowserSession, request: &RenderRequest) -> RenderResult {
        let scripts = self.meta.scripts_for(request.source.path());

        let html = match tokio::time::timeout(
            request.timeout,
            self.fetch_with_retries(session, request, &scripts),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(source = %request.source, timeout = ?request.timeout, "Render deadline exceeded");
                return Err(RenderError::DeadlineExceeded(request.timeout));
            }
        };

        let html = if request.strip_external {
            strip_external_resources(&html)?
        } else {
            html
        };
        Ok(Bytes::from(html))
    }

    async fn fetch_with_retries(
        &self,
        session: &dyn BrowserSession,
        request: &RenderRequest,
        scripts: &[Arc<str>],
    ) -> Result<String, RenderError> {
        let max_attempts = request.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_once(session, &request.source, scripts).await {
                Ok(html) => {
                    metrics::record_fetch_attempt("success");
                    tracing::debug!(source = %request.source, attempt, "Page rendered");
                    return Ok(html);
                }
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    metrics::record_fetch_attempt("retry");
                    tracing::info!(source = %request.source, attempt, error = %e, "Retrying render");
                }
                Err(e) => {
                    metrics::record_fetch_attempt("failure");
                    tracing::warn!(source = %request.source, attempt, error = %e, "Render failed");
                    return Err(e);
                }
            }
        }
    }
}

async fn attempt_once(
    session: &dyn BrowserSession,
    source: &Url,
    scripts: &[Arc<str>],
) -> Result<String, RenderError> {
    let mut context = session.new_context().await?;
    let result = render_in(context.as_mut(), source, scripts).await;
    if let Err(e) = context.close().await {
        tracing::debug!(error = %e, "Failed to close navigation context");
    }
    result
}

async fn render_in(
    context: &mut dyn NavigationContext,
    source: &Url,
    scripts: &[Arc<str>],
) -> Result<String, RenderError> {
    context.navigate(source).await?;
    if !context.document_ready().await? {
        return Err(RenderError::EmptyDocument);
    }
    for script in scripts {
        context.evaluate(script).await?;
    }
    Ok(context.outer_html().await?)
}
