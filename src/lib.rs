//! Context-scoped structured logging and HTTP request instrumentation.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod observability;

pub use config::AppConfig;
pub use http::{ContextLayer, HttpServer, RequestIdLayer, RequestLogLayer};
pub use lifecycle::Shutdown;
pub use logging::{Context, Field, Level, LevelRegister, Logger, Options};
