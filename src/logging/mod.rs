//! Context-scoped structured logging.
//!
//! # Data Flow
//! ```text
//! Sink + Options
//!     → logger.rs (immutable Logger handle, gated by a LevelRegister)
//!     → context.rs (handle stored in a Context scope chain)
//!     → with()/named() derive child handles into child contexts
//!     → from_context() retrieves the nearest handle (or the no-op one)
//!     → sink.rs (TracingSink, JsonSink, CaptureSink, NopSink)
//! ```
//!
//! # Design Decisions
//! - Contexts and handles are never mutated; deriving returns new values
//! - Retrieval never fails: an empty context yields the no-op handle
//! - The level register is the only shared mutable state

pub mod context;
pub mod field;
pub mod level;
pub mod logger;
pub mod sink;

pub use context::{error, from_context, info, named, new, with, with_logger, Context};
pub use field::{Field, Value};
pub use level::{Level, LevelRegister, ParseLevelError};
pub use logger::{Logger, Options};
pub use sink::{CaptureSink, CapturedRecord, JsonSink, NopSink, Record, Sink, TracingSink};
