//! # ch-codec
//!
//! Async byte transport and buffered streams for the ClickHouse native
//! protocol.
//!
//! ## Features
//!
//! - TCP transport with independent connect, send and receive timeouts
//! - Chunked input buffering with varint, string and float readers
//! - Frame decoding that retries [`native_protocol`] decoders until the
//!   buffered input holds a complete frame
//! - Packet-at-a-time output batching
//!
//! ## Architecture
//!
//! ```text
//! TcpStream → Transport (timeouts) → InputStream (buffer) → Client
//!                                  ← OutputStream (one send per packet)
//! ```
//!
//! The [`InputStream`] owns the transport; an [`OutputStream`] flushes
//! through [`InputStream::transport_mut`]. Both are single-owner values:
//! one connection, one in-flight exchange.
//!
//! ```rust,ignore
//! use ch_codec::{InputStream, OutputStream, Transport, TransportTimeouts};
//!
//! let mut transport = Transport::new(TransportTimeouts::default());
//! transport.connect("localhost", 9000).await?;
//! let mut input = InputStream::new(transport);
//! let mut output = OutputStream::new();
//!
//! output.write_varint(4); // ping
//! output.flush(input.transport_mut()).await?;
//! let code = input.read_varint().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod stream;
pub mod transport;

pub use error::CodecError;
pub use stream::{InputStream, OutputStream, READ_CHUNK_SIZE};
pub use transport::{MAX_RECEIVE_CHUNK, Transport, TransportTimeouts};
