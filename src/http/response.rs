//! Response handling and transformation.
//!
//! # Responsibilities
//! - Overlay diagnostic headers onto backend responses
//! - Build redirect and gateway-error responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the body
//! - Diagnostic headers replace backend headers of the same name
//! - Backend timeouts result in 504 Gateway Timeout, other failures in 502

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::http::fetch::FetchError;

/// Overlay `diagnostics` onto `response`.
///
/// Status, body and extensions are kept. Each diagnostic header replaces
/// every backend value of that name. An empty overlay returns the response
/// untouched, and annotating twice is the same as annotating once.
pub fn annotate<B>(response: Response<B>, diagnostics: &HeaderMap) -> Response<B> {
    if diagnostics.is_empty() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    for (name, value) in diagnostics {
        parts.headers.insert(name.clone(), value.clone());
    }
    Response::from_parts(parts, body)
}

/// `301 Moved Permanently` to `location`, with no body.
pub fn redirect(location: &str) -> Response<Body> {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location = %location, "Redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Gateway error for a failed fetch.
pub fn upstream_error(error: &FetchError) -> Response<Body> {
    match error {
        FetchError::Timeout => {
            (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
        }
        FetchError::Upstream(_) => {
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
