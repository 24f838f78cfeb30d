//! Download engine seam and the counting sink handed to it.
//!
//! The engine performs the actual multi-connection chunked fetch. The task
//! manager only supplies a location, a concurrency degree, a sink and a
//! cancellation signal.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::rpc::{RemoteApi, RemoteFileReference};

/// Streams a remote file into a sink.
///
/// Implementations must observe `cancel` and return [`EngineError::Cancelled`]
/// once it fires. Bytes may be written in any chunk size.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Stream `file` into `sink` using up to `threads` parallel connections
    async fn stream(
        &self,
        api: Arc<dyn RemoteApi>,
        file: &RemoteFileReference,
        threads: usize,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: CancellationToken,
    ) -> Result<(), EngineError>;
}

/// Sink wrapper that adds every written byte to a shared counter.
///
/// The counter is read concurrently by progress polling and the telemetry
/// sampler; it only ever grows.
pub struct CountingWriter<W> {
    inner: W,
    written: Arc<AtomicU64>,
}

impl<W> CountingWriter<W> {
    /// Wrap `inner`, accumulating into `written`
    pub fn new(inner: W, written: Arc<AtomicU64>) -> Self {
        Self { inner, written }
    }

    /// Bytes written through this sink and any other sharing the counter
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CountingWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            self.written.fetch_add(*n as u64, Ordering::Relaxed);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
