//! Fixed-layout server packets.
//!
//! Each `decode` reads the body after the packet code; each `encode`
//! writes the code as well.

use bytes::{Buf, BufMut};

use crate::codec::{get_string, get_varint, put_string, put_varint};
use crate::error::ProtocolError;
use crate::packet::ServerCode;

/// Write a packet that consists of its code alone (`Pong`, `EndOfStream`).
pub fn encode_code(dst: &mut impl BufMut, code: ServerCode) {
    put_varint(dst, code.as_u64());
}

/// Progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Rows processed so far.
    pub rows: u64,
    /// Bytes processed so far.
    pub bytes: u64,
    /// Estimated total rows to process.
    pub total_rows: u64,
}

impl Progress {
    /// Write the packet.
    pub fn encode(&self, dst: &mut impl BufMut) {
        encode_code(dst, ServerCode::Progress);
        put_varint(dst, self.rows);
        put_varint(dst, self.bytes);
        put_varint(dst, self.total_rows);
    }

    /// Read the packet body.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            rows: get_varint(src)?,
            bytes: get_varint(src)?,
            total_rows: get_varint(src)?,
        })
    }
}

/// Profiling counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileInfo {
    /// Rows read by the query.
    pub rows_read: u64,
    /// Bytes read by the query.
    pub bytes_read: u64,
    /// Elapsed wall time in seconds.
    pub elapsed_seconds: f64,
}

impl ProfileInfo {
    /// Write the packet; elapsed time is carried in whole milliseconds.
    pub fn encode(&self, dst: &mut impl BufMut) {
        encode_code(dst, ServerCode::ProfileInfo);
        put_varint(dst, self.rows_read);
        put_varint(dst, self.bytes_read);
        put_varint(dst, (self.elapsed_seconds * 1000.0).round() as u64);
    }

    /// Read the packet body.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            rows_read: get_varint(src)?,
            bytes_read: get_varint(src)?,
            elapsed_seconds: get_varint(src)? as f64 / 1000.0,
        })
    }
}

/// Server-side exception, possibly wrapping a nested cause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionPacket {
    /// Error code.
    pub code: u64,
    /// Exception class name.
    pub name: String,
    /// Error message.
    pub message: String,
    /// Server stack trace.
    pub stack_trace: String,
    /// Nested cause.
    pub nested: Option<Box<ExceptionPacket>>,
}

impl ExceptionPacket {
    /// Write the packet including every nested cause.
    pub fn encode(&self, dst: &mut impl BufMut) {
        encode_code(dst, ServerCode::Exception);
        let mut current = Some(self);
        while let Some(exception) = current {
            put_varint(dst, exception.code);
            put_string(dst, &exception.name);
            put_string(dst, &exception.message);
            put_string(dst, &exception.stack_trace);
            put_varint(dst, u64::from(exception.nested.is_some()));
            current = exception.nested.as_deref();
        }
    }

    /// Read the packet body including every nested cause.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let mut chain = Vec::new();
        loop {
            let code = get_varint(src)?;
            let name = get_string(src)?;
            let message = get_string(src)?;
            let stack_trace = get_string(src)?;
            let has_nested = get_varint(src)? != 0;
            chain.push(Self {
                code,
                name,
                message,
                stack_trace,
                nested: None,
            });
            if !has_nested {
                break;
            }
        }

        // Link innermost-first so each outer exception owns its cause.
        let mut nested = None;
        while let Some(mut exception) = chain.pop() {
            exception.nested = nested.map(Box::new);
            nested = Some(exception);
        }
        nested.ok_or_else(|| ProtocolError::MalformedPacket("empty exception".into()))
    }
}
