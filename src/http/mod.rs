//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing span)
//!     → request.rs (inbound URL, forwarded headers)
//!     → [routing engine decides backend and target]
//!     → fetch.rs (outbound request, streamed body)
//!     → response.rs (diagnostic overlay, gateway errors)
//!     → Send to client
//! ```

pub mod fetch;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use fetch::{Fetch, FetchError, HttpFetcher, OutboundRequest};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer, Pipeline, ServerError};
