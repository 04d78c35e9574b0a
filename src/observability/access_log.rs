//! Asynchronous access-log shipping.
//!
//! # Responsibilities
//! - Decide whether a response is worth logging
//! - Serialize request/response metadata as JSON
//! - POST it to the backend's log endpoint on a detached task
//!
//! # Design Decisions
//! - Fire-and-forget: the response path never awaits delivery
//! - Delivery failures are traced at debug level and counted, never surfaced
//! - Redirects and static assets (images, fonts) are not logged

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::schema::AccessLogConfig;
use crate::observability::metrics;
use crate::routing::types::Backend;

/// Request half of an access-log record.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub method: String,
    /// Path and query as received.
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub status: u16,
}

/// One access-log record as posted to the log sink.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    pub request: RequestRecord,
    pub response: ResponseRecord,
}

impl AccessRecord {
    pub fn new(
        time: DateTime<Utc>,
        address: Option<IpAddr>,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        status: StatusCode,
    ) -> Self {
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            request: RequestRecord {
                time,
                address: address.map(|ip| ip.to_string()),
                method: method.to_string(),
                url,
                headers: flatten_headers(headers),
            },
            response: ResponseRecord {
                status: status.as_u16(),
            },
        }
    }
}

/// Repeated headers are joined with `, `; invalid UTF-8 is replaced.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match flat.entry(name.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into_owned());
            }
        }
    }
    flat
}

/// Ships access-log records to the configured endpoints.
#[derive(Debug, Clone)]
pub struct AccessLogger {
    client: reqwest::Client,
    config: AccessLogConfig,
}

impl AccessLogger {
    pub fn new(config: &AccessLogConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Whether a response should be logged at all.
    pub fn should_log(status: StatusCode, headers: &HeaderMap) -> bool {
        if status.is_redirection() || headers.contains_key(header::LOCATION) {
            return false;
        }
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        !(content_type.contains("image") || content_type.contains("font"))
    }

    /// Endpoint for `backend`, if logging is enabled and one is configured.
    pub fn destination(&self, backend: Backend) -> Option<&str> {
        if !self.config.enabled {
            return None;
        }
        self.config.endpoint_for(backend)
    }

    /// Post `record` in the background. Returns the task handle when a post
    /// was scheduled; callers are not expected to join it.
    pub fn emit(
        &self,
        backend: Backend,
        response_headers: &HeaderMap,
        record: AccessRecord,
    ) -> Option<JoinHandle<()>> {
        let status = StatusCode::from_u16(record.response.status).ok()?;
        if !Self::should_log(status, response_headers) {
            return None;
        }
        let endpoint = self.destination(backend)?.to_string();
        let client = self.client.clone();

        Some(tokio::spawn(async move {
            let result = client
                .post(&endpoint)
                .json(&record)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(e) = result {
                tracing::debug!(endpoint = %endpoint, error = %e, "Access log delivery failed");
                metrics::record_access_log_failure();
            }
        }))
    }
}
