//! Buffered reader and writer over a [`Transport`].
//!
//! [`InputStream`] keeps a receive buffer fed in chunks of
//! [`READ_CHUNK_SIZE`] to [`MAX_RECEIVE_CHUNK`] bytes, so field-level reads
//! rarely touch the network and a claimed length never sizes an allocation. [`OutputStream`] accumulates a whole packet in memory and sends
//! it with a single [`Transport::send`] on flush.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use native_protocol::ProtocolError;
use native_protocol::codec::{self, decode_varint};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::CodecError;
use crate::transport::{MAX_RECEIVE_CHUNK, Transport};

/// Minimum number of bytes requested from the transport per refill.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Buffered reader that owns the connection's transport.
pub struct InputStream<S = TcpStream> {
    transport: Transport<S>,
    buffer: BytesMut,
}

impl<S> InputStream<S> {
    /// Wrap a transport.
    #[must_use]
    pub fn new(transport: Transport<S>) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Get the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }

    /// Get the underlying transport mutably (writers flush through it).
    pub fn transport_mut(&mut self) -> &mut Transport<S> {
        &mut self.transport
    }

    /// Number of bytes already buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<S> InputStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Pull one chunk from the transport; returns 0 when the peer closed.
    ///
    /// `wanted` is a hint only: each refill is clamped to
    /// [`MAX_RECEIVE_CHUNK`], so a length prefix never sizes an allocation.
    async fn fill(&mut self, wanted: usize) -> Result<usize, CodecError> {
        let request = wanted.clamp(READ_CHUNK_SIZE, MAX_RECEIVE_CHUNK);
        let received = self.transport.receive_into(&mut self.buffer, request).await?;
        tracing::trace!(received, buffered = self.buffer.len(), "filled input buffer");
        Ok(received)
    }

    /// Like `fill`, but a closed peer is an error.
    async fn fill_required(&mut self, missing: usize) -> Result<(), CodecError> {
        if self.fill(missing).await? == 0 {
            return Err(CodecError::UnexpectedEof { expected: missing });
        }
        Ok(())
    }

    /// Read up to `n` bytes, stopping early only if the stream ends.
    pub async fn read(&mut self, n: usize) -> Result<Bytes, CodecError> {
        while self.buffer.len() < n {
            let missing = n - self.buffer.len();
            if self.fill(missing).await? == 0 {
                break;
            }
        }
        let take = n.min(self.buffer.len());
        Ok(self.buffer.split_to(take).freeze())
    }

    /// Read exactly `n` bytes.
    pub async fn read_exactly(&mut self, n: usize) -> Result<Bytes, CodecError> {
        while self.buffer.len() < n {
            let missing = n - self.buffer.len();
            self.fill_required(missing).await?;
        }
        Ok(self.buffer.split_to(n).freeze())
    }

    /// Check whether the peer closed with nothing left to read.
    ///
    /// Waits for at least one byte if the buffer is empty.
    pub async fn at_end(&mut self) -> Result<bool, CodecError> {
        if !self.buffer.is_empty() {
            return Ok(false);
        }
        Ok(self.fill(1).await? == 0)
    }

    /// Read an unsigned varint.
    pub async fn read_varint(&mut self) -> Result<u64, CodecError> {
        loop {
            if let Some((value, len)) = decode_varint(&self.buffer)? {
                self.buffer.advance(len);
                return Ok(value);
            }
            self.fill_required(1).await?;
        }
    }

    /// Read a length-prefixed byte string.
    pub async fn read_binary_string(&mut self) -> Result<Bytes, CodecError> {
        let len = codec::length_to_usize(self.read_varint().await?)?;
        self.read_exactly(len).await
    }

    /// Read a length-prefixed UTF-8 string.
    pub async fn read_string(&mut self) -> Result<String, CodecError> {
        let raw = self.read_binary_string().await?;
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8.into())
    }

    /// Read a little-endian `f32`.
    pub async fn read_f32(&mut self) -> Result<f32, CodecError> {
        let mut raw = self.read_exactly(4).await?;
        Ok(raw.get_f32_le())
    }

    /// Read a little-endian `f64`.
    pub async fn read_f64(&mut self) -> Result<f64, CodecError> {
        let mut raw = self.read_exactly(8).await?;
        Ok(raw.get_f64_le())
    }

    /// Decode a fixed-layout frame, refilling until `decode` stops
    /// reporting [`ProtocolError::Incomplete`].
    ///
    /// Input is consumed only once `decode` succeeds.
    pub async fn read_frame<T, F>(&mut self, decode: F) -> Result<T, CodecError>
    where
        F: Fn(&mut &[u8]) -> Result<T, ProtocolError>,
    {
        loop {
            let mut cursor = &self.buffer[..];
            let result = decode(&mut cursor);
            let consumed = self.buffer.len() - cursor.len();
            let needed = match result {
                Ok(frame) => {
                    self.buffer.advance(consumed);
                    return Ok(frame);
                }
                Err(ProtocolError::Incomplete { needed }) => needed,
                Err(e) => return Err(e.into()),
            };
            self.fill_required(needed.max(1)).await?;
        }
    }
}

impl<S> std::fmt::Debug for InputStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("transport", &self.transport)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

/// In-memory packet writer.
#[derive(Debug, Default)]
pub struct OutputStream {
    buffer: BytesMut,
}

impl OutputStream {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw buffer, for encoders that write through [`BufMut`].
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Bytes written since the last flush.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop pending bytes without sending them.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Write an unsigned varint.
    pub fn write_varint(&mut self, value: u64) {
        codec::put_varint(&mut self.buffer, value);
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        codec::put_string(&mut self.buffer, s);
    }

    /// Write a length-prefixed byte string.
    pub fn write_binary_string(&mut self, data: &[u8]) {
        codec::put_binary(&mut self.buffer, data);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.put_slice(data);
    }

    /// Write a little-endian `f32`.
    pub fn write_f32(&mut self, value: f32) {
        codec::put_f32(&mut self.buffer, value);
    }

    /// Write a little-endian `f64`.
    pub fn write_f64(&mut self, value: f64) {
        codec::put_f64(&mut self.buffer, value);
    }

    /// Send everything pending as one transport write, then reset.
    ///
    /// The buffer is reset even when the send fails; a failed send leaves
    /// the session in an unknown state anyway.
    pub async fn flush<S>(&mut self, transport: &mut Transport<S>) -> Result<(), CodecError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = self.buffer.split().freeze();
        transport.send(&pending).await
    }
}
