//! Per-request logging context.
//!
//! # Responsibilities
//! - Seed each request with a base `Context` (listener scope)
//! - Annotate the logger with the remote connection address when known
//! - Let handlers extract the current `Context`
//!
//! # Design Decisions
//! - The context lives in request extensions, keyed by type
//! - Missing context is not an error; handlers get the empty context

use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context as TaskContext, Poll};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Request},
};
use tower::{Layer, Service};

use crate::logging::{self, Context, Field, Logger};

/// Read the logging context stored on a request.
pub trait ContextExt {
    /// The stored context, or the empty one.
    fn context(&self) -> Context;
}

impl<B> ContextExt for Request<B> {
    fn context(&self) -> Context {
        self.extensions().get::<Context>().cloned().unwrap_or_default()
    }
}

impl ContextExt for Parts {
    fn context(&self) -> Context {
        self.extensions.get::<Context>().cloned().unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.context())
    }
}

/// Layer that installs a base `Context` on every request.
#[derive(Debug, Clone, Default)]
pub struct ContextLayer {
    base: Context,
}

impl ContextLayer {
    pub fn new(base: Context) -> Self {
        Self { base }
    }

    /// Base context whose logger carries the listener address.
    pub fn for_listener(ctx: &Context, logger: &Logger, listener: SocketAddr) -> Self {
        let logger = logger.with([Field::display("listener", listener)]);
        Self::new(logging::with_logger(ctx, logger))
    }

    pub fn base(&self) -> &Context {
        &self.base
    }
}

impl<S> Layer<S> for ContextLayer {
    type Service = ContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContextService {
            inner,
            base: self.base.clone(),
        }
    }
}

/// Service produced by [`ContextLayer`].
#[derive(Debug, Clone)]
pub struct ContextService<S> {
    inner: S,
    base: Context,
}

impl<S, B> Service<Request<B>> for ContextService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let ctx = match req.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(remote)) => {
                logging::with(&self.base, [Field::display("conn", remote)]).0
            }
            None => self.base.clone(),
        };
        req.extensions_mut().insert(ctx);
        self.inner.call(req)
    }
}
