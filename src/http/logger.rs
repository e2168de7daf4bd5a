//! Request completion logging.
//!
//! # Responsibilities
//! - Derive a `request` logger with host, protocol, method and path fields
//! - Count request and response body bytes
//! - Emit one "request completed" entry per request
//!
//! # Design Decisions
//! - Response bodies stream after the handler returns, so the entry is emitted
//!   when the response body finishes, fails, or is dropped
//! - The status recorded is whatever the handler put on the response (200 unless set)

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    http::{header::HOST, Request, StatusCode},
    response::Response,
};
use tower::{Layer, Service};

use crate::http::body::{ByteCounter, CountingBody, ResponseBody};
use crate::http::context::ContextExt;
use crate::logging::{self, Field, Logger};

/// Name appended to the context logger for request entries.
pub const LOGGER_NAME: &str = "request";

/// Emits the completion entry when dropped.
struct Completion {
    logger: Logger,
    start: Instant,
    status: StatusCode,
    request_bytes: ByteCounter,
    response_bytes: ByteCounter,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.logger.info(
            "request completed",
            &[
                Field::new("request_body_bytes", self.request_bytes.get()),
                Field::new("response_status_code", self.status.as_u16()),
                Field::new("response_body_bytes", self.response_bytes.get()),
                Field::new("elapsed_duration", self.start.elapsed()),
            ],
        );
    }
}

/// Layer that logs request metadata and completion metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Debug, Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

impl<S> Service<Request<Body>> for RequestLogService<S>
where
    S: Service<Request<Body>, Response = Response>,
    S::Future: Send + 'static,
    S::Error: 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| req.uri().host())
            .unwrap_or_default()
            .to_string();
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.uri().path())
            .to_string();

        let (ctx, logger) = logging::named(
            &req.context(),
            LOGGER_NAME,
            [
                Field::string("host", host),
                Field::string("protocol", format!("{:?}", req.version())),
                Field::display("method", req.method()),
                Field::string("path", path),
            ],
        );

        let request_bytes = ByteCounter::new();
        let (mut parts, body) = req.into_parts();
        parts.extensions.insert(ctx);
        let req = Request::from_parts(
            parts,
            Body::new(CountingBody::new(body, request_bytes.clone())),
        );

        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let response = match future.await {
                Ok(response) => response,
                Err(err) => {
                    // No response to stream: log now.
                    drop(Completion {
                        logger,
                        start,
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        request_bytes,
                        response_bytes: ByteCounter::new(),
                    });
                    return Err(err);
                }
            };

            let completion = Completion {
                logger,
                start,
                status: response.status(),
                request_bytes,
                response_bytes: ByteCounter::new(),
            };
            let response_bytes = completion.response_bytes.clone();

            let (parts, body) = response.into_parts();
            let body = Body::new(ResponseBody::new(body, response_bytes, completion));
            Ok(Response::from_parts(parts, body))
        })
    }
}
