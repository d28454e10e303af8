//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
    Router,
};
use tempfile::TempDir;
use tower::ServiceExt;

use static_server::config::ServeConfig;
use static_server::http::HttpServer;
use static_server::observability::{AccessRecord, LogSink};

pub const CLIENT: &str = "127.0.0.1:40000";

pub const BIG_TEXT_LINE: &str = "The quick brown fox jumps over the lazy dog.\n";

/// A document root with ordinary, hidden and nested content.
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(root.join("style.css"), "body { color: red; }").unwrap();
    fs::write(root.join("app.js"), "console.log('hi');").unwrap();
    fs::write(root.join("big.txt"), BIG_TEXT_LINE.repeat(200)).unwrap();
    fs::write(root.join("404.html"), "<p>custom not found</p>").unwrap();
    fs::write(root.join(".env"), "SECRET=1").unwrap();
    fs::create_dir(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "[core]").unwrap();
    fs::create_dir(root.join("docs")).unwrap();
    fs::write(root.join("docs/b.txt"), "b").unwrap();
    fs::write(root.join("docs/a.txt"), "a").unwrap();
    fs::write(root.join("docs/.hidden"), "h").unwrap();
    fs::create_dir(root.join("docs/A")).unwrap();
    dir
}

/// Defaults pointed at `root`, with log output silenced.
pub fn config_for(root: &Path) -> ServeConfig {
    let mut config = ServeConfig::default();
    config.server.root_dir = root.display().to_string();
    config.logging.enabled = false;
    config
}

/// Sink keeping access records and error messages.
#[derive(Default)]
pub struct CaptureSink {
    pub access: Mutex<Vec<AccessRecord>>,
    pub errors: Mutex<Vec<String>>,
}

impl LogSink for CaptureSink {
    fn access(&self, record: &AccessRecord) {
        self.access.lock().unwrap().push(record.clone());
    }
    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

pub fn router(config: ServeConfig) -> Router {
    router_with_sink(config, Arc::new(CaptureSink::default()))
}

pub fn router_with_sink(config: ServeConfig, sink: Arc<CaptureSink>) -> Router {
    HttpServer::new(config, sink).unwrap().router()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Attach a peer address, as the TCP transport would.
pub fn from_client(mut request: Request<Body>, addr: &str) -> Request<Body> {
    let addr: SocketAddr = addr.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// Send through the router from [`CLIENT`] unless the request already names a peer.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    let request = if request.extensions().get::<ConnectInfo<SocketAddr>>().is_some() {
        request
    } else {
        from_client(request, CLIENT)
    };
    router.clone().oneshot(request).await.unwrap()
}

/// Send without any peer address.
pub async fn send_anonymous(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
