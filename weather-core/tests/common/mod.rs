//! Shared helpers for the service integration tests.
//!
//! Upstreams are real axum servers on ephemeral ports that record every
//! request they receive.

#![allow(dead_code)]

use axum::{
    Router,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;
use weather_core::{Config, GatewayState, ResolverState, gateway_router, resolver_router};

pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub request_id: Option<String>,
    pub body: Bytes,
}

struct StubInner {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

/// Canned upstream that counts and records calls.
#[derive(Clone)]
pub struct StubUpstream {
    pub addr: SocketAddr,
    inner: Arc<StubInner>,
}

impl StubUpstream {
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.inner.seen.lock().unwrap().clone()
    }
}

pub async fn spawn_stub(status: StatusCode, body: &str) -> StubUpstream {
    spawn_slow_stub(status, body, Duration::ZERO).await
}

pub async fn spawn_slow_stub(status: StatusCode, body: &str, delay: Duration) -> StubUpstream {
    start_stub(status, "application/json", body, delay).await
}

pub async fn spawn_stub_with_type(
    status: StatusCode,
    content_type: &'static str,
    body: &str,
) -> StubUpstream {
    start_stub(status, content_type, body, Duration::ZERO).await
}

async fn start_stub(
    status: StatusCode,
    content_type: &'static str,
    body: &str,
    delay: Duration,
) -> StubUpstream {
    let inner = Arc::new(StubInner {
        status,
        content_type,
        body: body.to_string(),
        delay,
        calls: AtomicUsize::new(0),
        seen: Mutex::new(Vec::new()),
    });

    let router = Router::new().fallback(stub_handler).with_state(inner.clone());
    let addr = spawn_router(router).await;

    StubUpstream { addr, inner }
}

async fn stub_handler(State(inner): State<Arc<StubInner>>, request: Request) -> Response {
    inner.calls.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    inner.seen.lock().unwrap().push(SeenRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        api_key: header_text(&parts.headers, "key"),
        request_id: header_text(&parts.headers, "x-request-id"),
        body,
    });

    if !inner.delay.is_zero() {
        tokio::time::sleep(inner.delay).await;
    }

    (inner.status, [(CONTENT_TYPE, inner.content_type)], inner.body.clone()).into_response()
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server error");
    });

    addr
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("listener has an address")
}

pub fn resolver_config(locality: SocketAddr, weather: SocketAddr) -> Config {
    Config {
        locality_url: format!("http://{locality}/ws"),
        weather_url: format!("http://{weather}/v1/current.json"),
        weather_api_key: Some(API_KEY.to_string()),
        ..Config::default()
    }
}

pub async fn spawn_resolver(config: &Config) -> SocketAddr {
    let state = ResolverState::from_config(config).expect("resolver state");
    spawn_router(resolver_router(Arc::new(state))).await
}

pub fn gateway_config(resolver: SocketAddr) -> Config {
    Config { resolver_url: format!("http://{resolver}"), ..Config::default() }
}

pub async fn spawn_gateway(resolver: SocketAddr) -> SocketAddr {
    spawn_gateway_with(&gateway_config(resolver)).await
}

pub async fn spawn_gateway_with(config: &Config) -> SocketAddr {
    let state = GatewayState::from_config(config).expect("gateway state");
    spawn_router(gateway_router(Arc::new(state))).await
}

pub fn zipcode_body(code: &str) -> String {
    serde_json::json!({ "zipcode": code }).to_string()
}
