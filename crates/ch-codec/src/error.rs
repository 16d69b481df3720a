//! Codec error types.

use std::time::Duration;

use native_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the transport and buffered streams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// TCP connect failed.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Address that was dialed.
        address: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An operation exceeded its time budget.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out (`connect`, `send`, `receive`).
        operation: &'static str,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// The transport is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The peer closed the stream before the requested bytes arrived.
    #[error("unexpected end of stream: {expected} more bytes required")]
    UnexpectedEof {
        /// Bytes still required when the stream ended.
        expected: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl CodecError {
    /// Check if the stream ended early.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }

    /// Check if an operation timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error came from the transport rather than the data.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Timeout { .. }
                | Self::NotConnected
                | Self::UnexpectedEof { .. }
                | Self::Io(_)
        )
    }
}
