//! HTTP instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → context.rs (base Context, listener + conn fields)
//!     → request.rs (X-Request-ID honored or generated, `id` field)
//!     → logger.rs (`request` logger, counting body proxies)
//!     → handler
//!     → body.rs (response bytes counted while streaming)
//!     → logger.rs ("request completed" entry)
//! ```

pub mod body;
pub mod context;
pub mod level;
pub mod logger;
pub mod request;
pub mod server;

pub use body::{ByteCounter, CountingBody, ResponseBody};
pub use context::{ContextExt, ContextLayer};
pub use level::level_routes;
pub use logger::RequestLogLayer;
pub use request::{
    generate_id, EntropyError, MakeRequestId, OsRandomId, RequestId, RequestIdError,
    RequestIdExt, RequestIdLayer, X_REQUEST_ID,
};
pub use server::HttpServer;
