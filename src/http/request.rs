//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Reconstruct the inbound URL routing decisions are made on
//! - Prepare headers for forwarding to a backend
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Original request preserved for logging; modified copy forwarded

use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;

use crate::http::headers::strip_hop_by_hop;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a UUID v4 request ID when the client did not send one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Request ID of a request, or `"unknown"` before the layer has run.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[derive(Debug, Error)]
pub enum InboundError {
    #[error("request has no host")]
    MissingHost,

    #[error("invalid request target: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// The URL the router sees: `scheme` plus the request's authority (or
/// `Host` header) and its path and query.
pub fn inbound_url(scheme: &str, parts: &Parts) -> Result<Url, InboundError> {
    let host = parts
        .uri
        .authority()
        .map(|authority| authority.as_str())
        .or_else(|| {
            parts
                .headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
        })
        .filter(|host| !host.is_empty())
        .ok_or(InboundError::MissingHost)?;

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Ok(Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))?)
}

/// Headers sent to the backend: everything but hop-by-hop headers and `Host`,
/// which the outbound client derives from the rewritten URL.
pub fn forward_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    strip_hop_by_hop(&mut forwarded);
    forwarded.remove(header::HOST);
    forwarded
}
