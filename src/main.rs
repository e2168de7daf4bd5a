//! ctxlog demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ ContextLayer ──▶ RequestIdLayer ──▶ RequestLogLayer ──▶ handler
//!                     (listener,       (X-Request-ID,     (request logger,
//!                      conn fields)     id field)          byte counters)
//!
//!     Client Response
//!     ◀────────────── X-Request-ID ◀── counted body ──▶ "request completed" entry
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use ctxlog::config::{load_config, AppConfig, LogFormat};
use ctxlog::http::HttpServer;
use ctxlog::lifecycle::{signals, Shutdown};
use ctxlog::logging::{self, Context, Field, JsonSink, LevelRegister, Options, Sink, TracingSink};
use ctxlog::observability;

#[derive(Parser)]
#[command(name = "ctxlog")]
#[command(about = "Demo server for context-scoped request logging", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum level emitted by context loggers (debug, info, warn, error, dpanic, panic, fatal)
    #[arg(long, value_name = LevelRegister::TYPE_NAME)]
    log_level: Option<String>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    let register = LevelRegister::new(config.logging.level);
    if let Some(level) = &cli.log_level {
        register.set(level)?;
        config.logging.level = register.level();
    }

    observability::init_logging(&config.logging)?;

    let sink: Arc<dyn Sink> = match config.logging.format {
        LogFormat::Json => Arc::new(JsonSink::stdout()),
        LogFormat::Pretty => Arc::new(TracingSink),
    };
    let ctx = logging::new(
        &Context::background(),
        sink,
        Options::new()
            .level(register.clone())
            .name(config.logging.name.clone()),
    );

    logging::info(
        &ctx,
        "Configuration loaded",
        &[
            Field::string("bind_address", config.listener.bind_address.clone()),
            Field::display("level", &register),
            Field::new("request_timeout_secs", config.timeouts.request_secs),
        ],
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, ctx.clone(), register);
    server.run(listener, shutdown.subscribe()).await?;

    logging::info(&ctx, "Shutdown complete", &[]);
    Ok(())
}
