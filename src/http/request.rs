//! Request identification.
//!
//! # Responsibilities
//! - Generate random request identifiers (32 bytes, lowercase hex)
//! - Honor an inbound X-Request-ID verbatim, or assign a new one
//! - Propagate the ID on the forwarded request and the response
//! - Annotate the request's context logger with an `id` field
//!
//! # Design Decisions
//! - Generation failure answers 500 and logs; it never aborts the process
//! - The ID is stored in request extensions as a typed `RequestId`

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::{
    http::{header::InvalidHeaderValue, request::Parts, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tower::{Layer, Service};

use crate::http::context::ContextExt;
use crate::logging::{self, Field};

/// Correlation header name.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Number of random bytes in a generated identifier.
pub const ID_BYTES: usize = 32;

/// The random source could not supply bytes.
#[derive(Debug, Error)]
#[error("failed to read random bytes: {source}")]
pub struct EntropyError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl EntropyError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Errors raised while assigning a request identifier.
#[derive(Debug, Error)]
pub enum RequestIdError {
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    #[error("identifier is not a valid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// Generate a 64-character lowercase hex identifier from the OS random source.
pub fn generate_id() -> Result<String, EntropyError> {
    generate_id_from(&mut OsRng)
}

/// Generate an identifier from `rng`.
pub fn generate_id_from<R: RngCore + ?Sized>(rng: &mut R) -> Result<String, EntropyError> {
    let mut buf = [0u8; ID_BYTES];
    rng.try_fill_bytes(&mut buf).map_err(EntropyError::new)?;
    Ok(hex::encode(buf))
}

/// A request's correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId {
    header: HeaderValue,
    text: Arc<str>,
}

impl RequestId {
    pub fn from_header(header: HeaderValue) -> Self {
        let text = Arc::from(String::from_utf8_lossy(header.as_bytes()));
        Self { header, text }
    }

    /// Text form. Non-UTF-8 inbound bytes are replaced.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl TryFrom<String> for RequestId {
    type Error = InvalidHeaderValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let header = HeaderValue::try_from(value.as_str())?;
        Ok(Self {
            header,
            text: Arc::from(value),
        })
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Access to the `RequestId` stored by [`RequestIdLayer`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get()
    }
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions.get()
    }
}

/// Source of fresh request identifiers.
pub trait MakeRequestId: Send + Sync + 'static {
    fn make_request_id(&self) -> Result<RequestId, RequestIdError>;
}

/// Identifiers from [`generate_id`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomId;

impl MakeRequestId for OsRandomId {
    fn make_request_id(&self) -> Result<RequestId, RequestIdError> {
        let id = generate_id()?;
        Ok(RequestId::try_from(id)?)
    }
}

/// Layer that ensures every request carries an X-Request-ID.
#[derive(Clone)]
pub struct RequestIdLayer {
    generator: Arc<dyn MakeRequestId>,
}

impl RequestIdLayer {
    pub fn new() -> Self {
        Self::with_generator(OsRandomId)
    }

    pub fn with_generator<G: MakeRequestId>(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}

impl Default for RequestIdLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            generator: Arc::clone(&self.generator),
        }
    }
}

/// Service produced by [`RequestIdLayer`].
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
    generator: Arc<dyn MakeRequestId>,
}

type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Future: Send + 'static,
    S::Error: 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let ctx = req.context();

        // Inbound IDs are honored verbatim; empty ones count as absent
        let inbound = req
            .headers()
            .get(&X_REQUEST_ID)
            .filter(|value| !value.is_empty())
            .cloned();

        let id = match inbound {
            Some(value) => RequestId::from_header(value),
            None => match self.generator.make_request_id() {
                Ok(id) => {
                    req.headers_mut()
                        .insert(X_REQUEST_ID, id.header_value().clone());
                    id
                }
                Err(err) => {
                    logging::error(
                        &ctx,
                        "failed to generate request identifier",
                        &[Field::display("error", &err)],
                    );
                    return Box::pin(async move {
                        Ok::<_, S::Error>(
                            (StatusCode::INTERNAL_SERVER_ERROR, "request identifier unavailable")
                                .into_response(),
                        )
                    });
                }
            },
        };

        let (ctx, _) = logging::with(&ctx, [Field::string("id", id.as_str())]);
        req.extensions_mut().insert(ctx);
        req.extensions_mut().insert(id.clone());

        let future = self.inner.call(req);
        Box::pin(async move {
            let mut response = future.await?;
            response
                .headers_mut()
                .insert(X_REQUEST_ID, id.header_value().clone());
            Ok(response)
        })
    }
}
