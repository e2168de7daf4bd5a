//! Subscriber initialization.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once per process
//! - Pick pretty or JSON output from configuration
//!
//! # Design Decisions
//! - Records from context loggers arrive on the `ctxlog` target and are
//!   already gated by the level register, so that target is let through at
//!   every level
//! - `RUST_LOG` overrides the default filter

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Default filter directives for a given threshold.
pub fn default_directives(config: &LoggingConfig) -> String {
    format!(
        "ctxlog=trace,ctxlog::http={level},tower_http={level}",
        level = config.level.as_tracing()
    )
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(config).into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
    }

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}
