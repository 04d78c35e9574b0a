//! Outbound requests to backends.
//!
//! # Responsibilities
//! - Send the rewritten request to its backend
//! - Stream request and response bodies without buffering
//! - Classify failures as timeouts or other upstream errors
//!
//! # Design Decisions
//! - Redirects from backends are passed through, never followed
//! - No retries: a failed fetch is terminal for the request
//! - Fetching sits behind the `Fetch` trait; `HttpFetcher` is the reqwest implementation

use std::future::Future;
use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Method, Response};
use thiserror::Error;
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::http::headers::strip_hop_by_hop;

/// A request ready to leave the router.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Upstream(e)
        }
    }
}

/// Performs outbound fetches.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<Response<Body>, FetchError>> + Send;
}

/// [`Fetch`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, request: OutboundRequest) -> Result<Response<Body>, FetchError> {
        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);

        // Bodiless requests stay bodiless rather than becoming chunked.
        if request.body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(request.body.into_data_stream()));
        }

        let upstream = builder.send().await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        // Carries a non-canonical reason phrase, if the backend sent one.
        let extensions = upstream.extensions().clone();

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        *response.extensions_mut() = extensions;
        Ok(response)
    }
}
