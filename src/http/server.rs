//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handlers
//! - Wire up middleware (context, request ID, request log, timeout)
//! - Mount the runtime level endpoint
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;
use crate::http::context::ContextLayer;
use crate::http::level::level_routes;
use crate::http::logger::RequestLogLayer;
use crate::http::request::RequestIdLayer;
use crate::lifecycle::ShutdownSignal;
use crate::logging::{self, Context, Field, LevelRegister};

/// Demo HTTP server instrumented with context logging.
pub struct HttpServer {
    config: AppConfig,
    context: Context,
    register: LevelRegister,
}

impl HttpServer {
    /// `context` should hold the root logger; `register` is the one that logger
    /// is gated on and is exposed through the level endpoint.
    pub fn new(config: AppConfig, context: Context, register: LevelRegister) -> Self {
        Self {
            config,
            context,
            register,
        }
    }

    /// Router seeded with the server's base context (no listener field).
    pub fn router(&self) -> Router {
        Self::build_router(
            &self.config,
            self.register.clone(),
            ContextLayer::new(self.context.clone()),
        )
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, register: LevelRegister, context: ContextLayer) -> Router {
        let mut router = Router::new()
            .route("/echo", any(echo_handler))
            .route("/status/{code}", any(status_handler));

        if let Some(path) = &config.logging.level_endpoint {
            router = router.nest(path, level_routes(register));
        }

        router
            .layer(timeout_layer(config))
            .layer(RequestLogLayer::new())
            .layer(RequestIdLayer::new())
            .layer(context)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let context = ContextLayer::for_listener(&self.context, self.context.logger(), addr);
        let base = context.base().clone();

        logging::info(&base, "HTTP server starting", &[]);

        let app = Self::build_router(&self.config, self.register.clone(), context)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        logging::info(&base, "HTTP server stopped", &[]);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Requests running past the configured timeout answer 408.
fn timeout_layer(config: &AppConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeouts.request_secs),
    )
}

/// Echo the request body back, logging its size on the request logger.
async fn echo_handler(ctx: Context, body: Bytes) -> Bytes {
    ctx.logger()
        .debug("echoing body", &[Field::new("bytes", body.len())]);
    body
}

/// Respond with the status code from the path and an empty body.
async fn status_handler(ctx: Context, Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => status.into_response(),
        Err(_) => {
            logging::error(&ctx, "invalid status code requested", &[Field::new("code", code)]);
            (StatusCode::BAD_REQUEST, "invalid status code").into_response()
        }
    }
}
