//! Response construction and error mapping.
//!
//! # Design Decisions
//! - Render errors map to status classes: client 4xx, timeout 408, upstream 502
//! - Handlers never panic on render failure; every error becomes a response

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::render::{CacheStatus, RenderError};

pub const X_CACHE_STATUS: &str = "x-cache-status";

/// HTTP status for a render failure.
pub fn status_for(error: &RenderError) -> StatusCode {
    match error {
        RenderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RenderError::DeadlineExceeded(_) => StatusCode::REQUEST_TIMEOUT,
        RenderError::EmptyDocument | RenderError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
        RenderError::SessionAllocationFailed(_) | RenderError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        RenderError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = match &self {
            RenderError::DeadlineExceeded(_) => "request timeout".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

/// A successful render.
pub fn html_response(html: Bytes, cache: CacheStatus) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (
                header::HeaderName::from_static(X_CACHE_STATUS),
                HeaderValue::from_static(cache.as_str()),
            ),
        ],
        html,
    )
        .into_response()
}
