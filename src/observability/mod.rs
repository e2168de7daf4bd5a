//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Context loggers, pretty format (logging::TracingSink)
//!     → tracing events on the `ctxlog` target
//!     → logging.rs subscriber (EnvFilter + fmt, pretty or JSON)
//!     → stdout
//!
//! Context loggers, JSON format (logging::JsonSink)
//!     → one JSON line per record, typed fields → stdout
//! ```
//!
//! # Design Decisions
//! - One global subscriber, installed by the binary
//! - The library never installs a subscriber on its own

pub mod logging;

pub use logging::init_logging;
