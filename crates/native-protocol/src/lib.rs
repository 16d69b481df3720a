//! # native-protocol
//!
//! Pure implementation of the ClickHouse native TCP protocol wire format.
//!
//! This crate provides the varint, string and fixed-width primitives,
//! packet codes, revision gates and the fixed-layout packets exchanged
//! between client and server (hello, query, progress, profile info,
//! exception, block framing).
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It works on [`bytes::Buf`] and
//! [`bytes::BufMut`] only and makes no assumptions about the async runtime.
//! Decoders report [`ProtocolError::Incomplete`] when their input runs
//! short, so stream readers can fetch more bytes and retry. Higher-level
//! crates build upon this foundation to provide async I/O.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bytes::BytesMut;
//! use native_protocol::{QueryPacket, Revision, encode_empty_block};
//!
//! let mut buf = BytesMut::new();
//! QueryPacket::new("SELECT 1", "default", Revision::CLIENT).encode(&mut buf);
//! encode_empty_block(&mut buf);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod block;
pub mod client;
pub mod codec;
pub mod error;
pub mod hello;
pub mod packet;
pub mod query;
pub mod revision;
pub mod server;

pub use block::{BlockHeader, BlockInfo, ColumnHeader, decode_empty_block, encode_empty_block};
pub use client::ClientPacket;
pub use error::ProtocolError;
pub use hello::{ClientHello, ServerHello};
pub use packet::{ClientCode, ServerCode};
pub use query::{ClientInfo, CompressionState, QueryKind, QueryPacket, QueryStage};
pub use revision::Revision;
pub use server::{ExceptionPacket, ProfileInfo, Progress, encode_code};
