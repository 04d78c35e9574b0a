//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, body timeout)
//! - Run the per-request pipeline: route, redirect or fetch, annotate, log
//! - Swap in recompiled routing state when the configuration changes

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    response::IntoResponse,
    routing::any,
    Router,
};
use chrono::Utc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::RequestBodyTimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, RouterConfig};
use crate::http::fetch::{Fetch, HttpFetcher, OutboundRequest};
use crate::http::request::{self, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response;
use crate::observability::access_log::{AccessLogger, AccessRecord};
use crate::observability::metrics;
use crate::routing::{RouteDecision, RoutingEngine};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request needs that is derived from configuration.
///
/// Replaced as a whole on reload; in-flight requests keep the one they loaded.
#[derive(Debug)]
pub struct Pipeline {
    pub engine: RoutingEngine,
    pub upstream_scheme: String,
    pub access_log: AccessLogger,
}

impl Pipeline {
    pub fn from_config(config: &RouterConfig) -> Result<Self, ServerError> {
        Ok(Self {
            engine: RoutingEngine::from_config(config)?,
            upstream_scheme: config.upstream.scheme.clone(),
            access_log: AccessLogger::new(
                &config.access_log,
                Duration::from_secs(config.timeouts.access_log_secs),
            )?,
        })
    }
}

/// Application state injected into handlers.
pub struct AppState<F> {
    pub pipeline: Arc<ArcSwap<Pipeline>>,
    pub fetcher: Arc<F>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<F: Fetch> AppState<F> {
    pub fn new(pipeline: Pipeline, fetcher: F) -> Self {
        Self {
            pipeline: Arc::new(ArcSwap::from_pointee(pipeline)),
            fetcher: Arc::new(fetcher),
        }
    }
}

/// HTTP server for the edge router.
pub struct HttpServer<F = HttpFetcher> {
    state: AppState<F>,
    config: RouterConfig,
}

impl HttpServer<HttpFetcher> {
    /// Create a server that fetches over the network.
    pub fn new(config: RouterConfig) -> Result<Self, ServerError> {
        let fetcher = HttpFetcher::new(&config.timeouts)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetch> HttpServer<F> {
    pub fn with_fetcher(config: RouterConfig, fetcher: F) -> Result<Self, ServerError> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self {
            state: AppState::new(pipeline, fetcher),
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Every configuration received on `config_updates` is compiled and, if
    /// that succeeds, swapped in atomically. A configuration that fails to
    /// compile is logged and the current one stays active.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let pipeline = self.state.pipeline.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match Pipeline::from_config(&config) {
                    Ok(next) => {
                        pipeline.store(Arc::new(next));
                        tracing::info!(
                            rules = config.routing.rules.len(),
                            "Routing configuration reloaded"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Rejected configuration update, keeping current configuration"
                        );
                    }
                }
            }
        });

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn build_router<F: Fetch>(config: &RouterConfig, state: AppState<F>) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request::request_id(request.headers()),
        )
    });

    Router::new()
        .route("/", any(proxy_handler::<F>))
        .route("/{*path}", any(proxy_handler::<F>))
        .with_state(state)
        .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(trace)
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

async fn proxy_handler<F: Fetch>(
    State(state): State<AppState<F>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    handle_request(&state, Some(peer.ip()), request).await
}

/// Run one request through the pipeline.
///
/// `receive → route → redirect (terminal) | fetch (terminal on failure)
/// → annotate → schedule access log`.
pub async fn handle_request<F: Fetch>(
    state: &AppState<F>,
    peer: Option<IpAddr>,
    request: Request<Body>,
) -> Response<Body> {
    let start = Instant::now();
    let received_at = Utc::now();
    let pipeline = state.pipeline.load_full();

    let (parts, body) = request.into_parts();
    let request_id = request::request_id(&parts.headers).to_string();

    let inbound = match request::inbound_url(&pipeline.upstream_scheme, &parts) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting request");
            return (axum::http::StatusCode::BAD_REQUEST, "Invalid request target").into_response();
        }
    };

    let forward = match pipeline.engine.route(&inbound, &parts.headers) {
        RouteDecision::Redirect { backend, location } => {
            tracing::info!(
                request_id = %request_id,
                backend = %backend,
                path = %inbound.path(),
                location = %location,
                "Static redirect"
            );
            metrics::record_redirect(inbound.path());
            return response::redirect(&location);
        }
        RouteDecision::Forward(forward) => forward,
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        backend = %forward.backend,
        environment = forward.environment.map(|e| e.as_str()).unwrap_or("unknown"),
        rule = forward.rule.as_deref().unwrap_or("default"),
        upstream = %forward.url,
        "Forwarding request"
    );

    let outbound = OutboundRequest {
        method: parts.method.clone(),
        url: forward.url.clone(),
        headers: request::forward_headers(&parts.headers),
        body,
    };

    let upstream = match state.fetcher.fetch(outbound).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %forward.backend,
                upstream = %forward.url,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(forward.backend);
            let failed = response::annotate(response::upstream_error(&e), &forward.diagnostics);
            metrics::record_request(
                forward.backend,
                forward.environment,
                failed.status().as_u16(),
                start,
            );
            return failed;
        }
    };

    let response = response::annotate(upstream, &forward.diagnostics);
    metrics::record_request(
        forward.backend,
        forward.environment,
        response.status().as_u16(),
        start,
    );

    let record = AccessRecord::new(
        received_at,
        peer,
        &parts.method,
        &parts.uri,
        &parts.headers,
        response.status(),
    );
    // Detached: the handle is intentionally dropped.
    let _ = pipeline
        .access_log
        .emit(forward.backend, response.headers(), record);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fetch::FetchError;
    use crate::routing::rewrite::{OC_BACKEND, OC_ENVIRONMENT, OC_LANGUAGE};
    use axum::http::{header, HeaderValue, StatusCode};
    use std::sync::Mutex;

    /// Records every outbound request and answers with a canned result.
    #[derive(Default)]
    struct RecordingFetcher {
        seen: Mutex<Vec<(axum::http::Method, String)>>,
        fail_with_timeout: bool,
    }

    impl Fetch for RecordingFetcher {
        async fn fetch(&self, request: OutboundRequest) -> Result<Response<Body>, FetchError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.method.clone(), request.url.to_string()));
            if self.fail_with_timeout {
                return Err(FetchError::Timeout);
            }
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html")
                .header(OC_BACKEND, "spoofed")
                .body(Body::from("ok"))
                .unwrap())
        }
    }

    fn state(fetcher: RecordingFetcher) -> AppState<RecordingFetcher> {
        let mut config = RouterConfig::default();
        config.api.keys.production = Some("secret".to_string());
        AppState::new(Pipeline::from_config(&config).unwrap(), fetcher)
    }

    fn get(host: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    fn seen(state: &AppState<RecordingFetcher>) -> Vec<(axum::http::Method, String)> {
        state.fetcher.seen.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn forwards_and_annotates() {
        let state = state(RecordingFetcher::default());
        let mut request = get("opencollective.com", "/webpack");
        request
            .headers_mut()
            .insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR"));

        let response = handle_request(&state, None, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[OC_BACKEND], "frontend");
        assert_eq!(response.headers()[OC_ENVIRONMENT], "production");
        assert_eq!(response.headers()[OC_LANGUAGE], "pt");
        assert_eq!(
            seen(&state),
            vec![(
                axum::http::Method::GET,
                "https://frontend.opencollective.com/webpack?language=pt".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn redirects_never_fetch() {
        let state = state(RecordingFetcher::default());

        for path in ["/about", "/opensourcecollective"] {
            let response = handle_request(&state, None, get("opencollective.com", path)).await;
            assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
            assert!(response.headers().get(OC_BACKEND).is_none());
            assert!(response.headers().get(OC_ENVIRONMENT).is_none());
        }

        assert!(seen(&state).is_empty());
    }

    #[tokio::test]
    async fn timeout_maps_to_gateway_timeout() {
        let state = state(RecordingFetcher {
            fail_with_timeout: true,
            ..Default::default()
        });

        let response =
            handle_request(&state, None, get("staging.opencollective.com", "/api/graphql")).await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()[OC_BACKEND], "api");
        assert_eq!(seen(&state).len(), 1);
    }

    #[tokio::test]
    async fn missing_host_is_rejected() {
        let state = state(RecordingFetcher::default());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = handle_request(&state, None, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(seen(&state).is_empty());
    }

    #[tokio::test]
    async fn reload_swaps_the_pipeline() {
        let state = state(RecordingFetcher::default());

        let mut config = RouterConfig::default();
        config.routing.default_backend = crate::routing::Backend::Website;
        state
            .pipeline
            .store(Arc::new(Pipeline::from_config(&config).unwrap()));

        let response = handle_request(&state, None, get("localhost", "/anything")).await;
        assert_eq!(response.headers()[OC_BACKEND], "website");
    }

    #[tokio::test]
    async fn router_assigns_request_ids() {
        use axum::extract::connect_info::MockConnectInfo;
        use tower::ServiceExt;

        let server =
            HttpServer::with_fetcher(RouterConfig::default(), RecordingFetcher::default()).unwrap();
        let app = server
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let response = app
            .oneshot(get("opencollective.com", "/webpack/badge.svg"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[OC_BACKEND], "images");
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());

        let mut request = get("opencollective.com", "/");
        request
            .headers_mut()
            .insert(X_REQUEST_ID, HeaderValue::from_static("client-id"));
        let response = server.router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "client-id");
    }
}
