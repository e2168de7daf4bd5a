//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use ctxlog::config::AppConfig;
use ctxlog::http::HttpServer;
use ctxlog::lifecycle::Shutdown;
use ctxlog::logging::{self, CaptureSink, CapturedRecord, Context, Level, LevelRegister, Options};

/// Root context whose logger records into the returned sink.
pub fn capture_context(level: Level) -> (CaptureSink, LevelRegister, Context) {
    let sink = CaptureSink::new();
    let register = LevelRegister::new(level);
    let ctx = logging::new(
        &Context::background(),
        sink.clone(),
        Options::new().level(register.clone()).name("test"),
    );
    (sink, register, ctx)
}

/// Drive one request through `router` and collect the whole response body.
pub async fn send(router: Router, req: Request<Body>) -> (Response<()>, Bytes) {
    let response = router.oneshot(req).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    (Response::from_parts(parts, ()), bytes)
}

/// A running demo server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: CaptureSink,
    pub register: LevelRegister,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until at least `n` records were captured, or give up after a second.
    pub async fn wait_for_records(&self, n: usize) {
        for _ in 0..100 {
            if self.sink.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// First captured record with `message`, polling for up to a second.
    pub async fn wait_for_message(&self, message: &str) -> Option<CapturedRecord> {
        for _ in 0..100 {
            if let Some(record) = self
                .sink
                .records()
                .into_iter()
                .find(|r| r.message == message)
            {
                return Some(record);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the demo server with a capturing logger.
pub async fn start_server(config: AppConfig) -> TestServer {
    let (sink, register, ctx) = capture_context(Level::Debug);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, ctx, register.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        sink,
        register,
        shutdown,
    }
}
