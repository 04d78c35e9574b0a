//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use edge_router::config::RouterConfig;
use edge_router::http::HttpServer;
use edge_router::lifecycle::Shutdown;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that answers every request with a JSON description of it.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request<Body>) -> Json<Value> {
        let headers: BTreeMap<String, String> = request
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        Json(json!({
            "method": request.method().as_str(),
            "path": request.uri().path(),
            "query": request.uri().query(),
            "headers": headers,
        }))
    }

    serve(Router::new().fallback(echo)).await
}

/// Start a backend that serves a fixed body with the given content type.
pub async fn start_static_backend(content_type: &'static str, body: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        ([(header::CONTENT_TYPE, content_type)], body)
    });
    serve(app).await
}

/// Start a backend that answers every connection with `reply`, written verbatim.
pub async fn start_raw_backend(reply: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// Start a log sink; every JSON record posted to `/logs` is forwarded to the receiver.
pub async fn start_log_sink() -> (SocketAddr, mpsc::UnboundedReceiver<Value>) {
    async fn collect(
        State(tx): State<mpsc::UnboundedSender<Value>>,
        Json(record): Json<Value>,
    ) -> StatusCode {
        let _ = tx.send(record);
        StatusCode::NO_CONTENT
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/logs", post(collect)).with_state(tx);
    (serve(app).await, rx)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A configuration that treats `127.0.0.1` as production and talks plain HTTP.
pub fn local_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.upstream.scheme = "http".to_string();
    config.environments.production = vec!["127.0.0.1".to_string()];
    config.environments.staging = Vec::new();
    config.domains = Default::default();
    config.observability.metrics_enabled = false;
    config
}

/// A running router plus the handles needed to drive it.
pub struct RunningRouter {
    pub addr: SocketAddr,
    pub config_updates: mpsc::UnboundedSender<RouterConfig>,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl RunningRouter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_router(config: RouterConfig) -> RunningRouter {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let shutdown_rx: broadcast::Receiver<()> = shutdown.subscribe();

    let server = HttpServer::new(config).unwrap();
    let task = tokio::spawn(server.run(listener, updates_rx, shutdown_rx));

    RunningRouter {
        addr,
        config_updates,
        shutdown,
        task,
    }
}

/// A client that does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
