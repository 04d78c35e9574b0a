//! Edge request router library.
//!
//! Classifies every inbound request to one of several independently deployed
//! backends, rewrites it for that backend's physical host, negotiates the
//! caller's language and annotates the response with routing diagnostics.

pub mod config;
pub mod http;
pub mod language;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RoutingEngine;
