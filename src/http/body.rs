//! Byte-counting body proxies.
//!
//! Both proxies forward every frame and error from the wrapped body unchanged
//! and add the size of each data frame to a shared [`ByteCounter`].

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use bytes::Buf;
use http_body::{Body, Frame, SizeHint};

/// Shared running total of bytes.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn count_frame<D: Buf, E>(counter: &ByteCounter, polled: &Poll<Option<Result<Frame<D>, E>>>) {
    if let Poll::Ready(Some(Ok(frame))) = polled {
        if let Some(data) = frame.data_ref() {
            counter.add(data.remaining());
        }
    }
}

/// Counts the bytes read from a request body.
#[derive(Debug)]
pub struct CountingBody<B> {
    inner: B,
    counter: ByteCounter,
}

impl<B> CountingBody<B> {
    pub fn new(inner: B, counter: ByteCounter) -> Self {
        Self { inner, counter }
    }

    pub fn counter(&self) -> &ByteCounter {
        &self.counter
    }
}

impl<B> Body for CountingBody<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        count_frame(&this.counter, &polled);
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Counts the bytes written to a response body and drops a completion guard
/// once the body ends, fails, or is discarded.
pub struct ResponseBody<B, G> {
    inner: B,
    counter: ByteCounter,
    guard: Option<G>,
}

impl<B, G> ResponseBody<B, G> {
    pub fn new(inner: B, counter: ByteCounter, guard: G) -> Self {
        Self {
            inner,
            counter,
            guard: Some(guard),
        }
    }
}

impl<B, G> Body for ResponseBody<B, G>
where
    B: Body + Unpin,
    G: Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        count_frame(&this.counter, &polled);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.guard = None;
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
