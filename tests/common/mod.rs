//! Shared helpers for integration tests: a Portico instance on an
//! ephemeral port and a small upstream that echoes what it received.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use portico::config::RouteSpec;
use portico::error::PorticoError;
use portico::lifecycle::{Lifecycle, Phase};
use portico::routing::RouteTable;
use portico::server::{self, AppState};

pub fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path)
}

pub fn html_dir() -> String {
    fixture("html").display().to_string()
}

pub fn route_table(specs: &[(&str, &str)]) -> RouteTable {
    let specs: Vec<RouteSpec> = specs.iter().map(|(s, t)| RouteSpec::new(*s, *t)).collect();
    RouteTable::build(&specs).unwrap()
}

pub struct Options {
    pub tls: Option<RustlsConfig>,
    pub grace_period: Duration,
    pub upstream_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tls: None,
            grace_period: Duration::from_secs(5),
            upstream_timeout: Duration::from_secs(5),
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub phase: tokio::sync::watch::Receiver<Phase>,
    pub task: JoinHandle<Result<(), PorticoError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Cancel and wait for the controller to return.
    pub async fn stop(self) -> Result<(), PorticoError> {
        self.shutdown.cancel();
        self.task.await.unwrap()
    }
}

pub fn start(routes: RouteTable, options: Options) -> TestServer {
    let state = AppState::new(routes, options.tls.is_some(), options.upstream_timeout);
    let router = server::build_router(Arc::new(state));

    let shutdown = CancellationToken::new();
    let listening = Lifecycle::new("127.0.0.1:0".parse().unwrap(), shutdown.clone())
        .with_tls(options.tls)
        .with_grace_period(options.grace_period)
        .bind()
        .unwrap();
    let addr = listening.local_addr();
    let phase = listening.subscribe();

    let task = tokio::spawn(listening.serve(router));
    TestServer {
        addr,
        shutdown,
        phase,
        task,
    }
}

pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

/// Upstream handler that reports the request it received as JSON.
pub async fn echo(request: Request) -> String {
    let (parts, body) = request.into_parts();
    let header = |name: &str| {
        let values: Vec<&str> = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    };
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "host": header("host"),
        "x_forwarded_for": header("x-forwarded-for"),
        "x_forwarded_host": header("x-forwarded-host"),
        "x_forwarded_proto": header("x-forwarded-proto"),
        "x_session_hint": header("x-session-hint"),
        "body": String::from_utf8_lossy(&body),
    })
    .to_string()
}

pub async fn start_echo_upstream() -> SocketAddr {
    start_upstream(Router::new().fallback(echo)).await
}

/// Upstream that answers after `delay`.
pub async fn start_slow_upstream(delay: Duration) -> SocketAddr {
    start_upstream(Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "done"
    }))
    .await
}

pub fn no_redirects() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn read_title(body: &str) -> &str {
    let start = body.find("<title>").expect("page has a <title>") + "<title>".len();
    let end = body.find("</title>").expect("page has a </title>");
    &body[start..end]
}
