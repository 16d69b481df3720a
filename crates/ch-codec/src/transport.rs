//! Raw byte-stream transport with per-operation timeouts.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::CodecError;

/// Upper bound on the bytes requested from the stream by one receive.
pub const MAX_RECEIVE_CHUNK: usize = 64 * 1024;

/// Time budgets for transport operations.
///
/// A zero duration disables the timeout for that operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// Budget for establishing the TCP connection (default: 5s).
    pub connect: Duration,
    /// Budget for writing and flushing one send (default: 5s).
    pub send: Duration,
    /// Budget for one receive call (default: 5s).
    pub receive: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            send: Duration::from_secs(5),
            receive: Duration::from_secs(5),
        }
    }
}

impl TransportTimeouts {
    /// Create timeouts with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = timeout;
        self
    }

    /// Set the send timeout.
    #[must_use]
    pub fn send(mut self, timeout: Duration) -> Self {
        self.send = timeout;
        self
    }

    /// Set the receive timeout.
    #[must_use]
    pub fn receive(mut self, timeout: Duration) -> Self {
        self.receive = timeout;
        self
    }
}

async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, CodecError>
where
    F: Future<Output = Result<T, CodecError>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CodecError::Timeout {
            operation,
            timeout: limit,
        })?
}

/// A byte-stream endpoint.
///
/// Generic over the underlying stream so tests can drive it with in-memory
/// pipes; production code uses [`TcpStream`].
pub struct Transport<S = TcpStream> {
    stream: Option<S>,
    timeouts: TransportTimeouts,
}

impl<S> Transport<S> {
    /// Create a transport that is not connected yet.
    #[must_use]
    pub fn new(timeouts: TransportTimeouts) -> Self {
        Self {
            stream: None,
            timeouts,
        }
    }

    /// Wrap an already connected stream.
    #[must_use]
    pub fn from_stream(stream: S, timeouts: TransportTimeouts) -> Self {
        Self {
            stream: Some(stream),
            timeouts,
        }
    }

    /// Check if a stream is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the configured timeouts.
    #[must_use]
    pub fn timeouts(&self) -> TransportTimeouts {
        self.timeouts
    }
}

impl Transport<TcpStream> {
    /// Open a TCP connection to `host:port`.
    ///
    /// Any previously attached stream is dropped first.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), CodecError> {
        self.stream = None;
        let address = format!("{host}:{port}");
        tracing::debug!(address = %address, timeout = ?self.timeouts.connect, "opening TCP connection");

        let stream = with_timeout(self.timeouts.connect, "connect", async {
            TcpStream::connect(&address)
                .await
                .map_err(|source| CodecError::Connect {
                    address: address.clone(),
                    source,
                })
        })
        .await?;
        stream.set_nodelay(true)?;

        self.stream = Some(stream);
        Ok(())
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Write all of `data` and flush it.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), CodecError> {
        let stream = self.stream.as_mut().ok_or(CodecError::NotConnected)?;
        with_timeout(self.timeouts.send, "send", async {
            stream.write_all(data).await?;
            stream.flush().await?;
            Ok::<_, CodecError>(())
        })
        .await?;
        tracing::trace!(bytes = data.len(), "sent");
        Ok(())
    }

    /// Receive up to `max` bytes.
    ///
    /// Short reads are allowed; an empty result means the peer closed the
    /// stream.
    pub async fn receive(&mut self, max: usize) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(max.min(MAX_RECEIVE_CHUNK));
        self.receive_into(&mut buf, max).await?;
        Ok(buf.freeze())
    }

    /// Append up to `max` bytes to `buf`, reading into its spare capacity.
    ///
    /// A single call never reads more than [`MAX_RECEIVE_CHUNK`] bytes, so
    /// the caller's size hint does not decide the allocation. Returns the
    /// number of bytes appended; 0 means the peer closed the stream.
    pub async fn receive_into(
        &mut self,
        buf: &mut BytesMut,
        max: usize,
    ) -> Result<usize, CodecError> {
        let stream = self.stream.as_mut().ok_or(CodecError::NotConnected)?;
        let limit = max.min(MAX_RECEIVE_CHUNK);
        buf.reserve(limit);
        let n = with_timeout(self.timeouts.receive, "receive", async {
            let mut limited = (&mut *stream).take(limit as u64);
            Ok::<_, CodecError>(limited.read_buf(buf).await?)
        })
        .await?;
        tracing::trace!(bytes = n, "received");
        Ok(n)
    }

    /// Receive exactly `n` bytes.
    ///
    /// The receive timeout applies to each chunk. Fails with
    /// [`CodecError::UnexpectedEof`] if the peer closes first.
    pub async fn receive_exactly(&mut self, n: usize) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(n.min(MAX_RECEIVE_CHUNK));
        while buf.len() < n {
            let missing = n - buf.len();
            if self.receive_into(&mut buf, missing).await? == 0 {
                return Err(CodecError::UnexpectedEof { expected: missing });
            }
        }
        Ok(buf.freeze())
    }

    /// Shut down and drop the stream.
    ///
    /// Safe to call on a never-connected or already closed transport.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let shutdown = async {
                stream.shutdown().await?;
                Ok::<_, CodecError>(())
            };
            if let Err(e) = with_timeout(self.timeouts.send, "send", shutdown).await {
                tracing::debug!(error = %e, "error shutting down transport");
            }
        }
    }
}

impl<S> std::fmt::Debug for Transport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
