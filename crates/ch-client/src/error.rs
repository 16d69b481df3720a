//! Client error types.

use ch_codec::CodecError;
use ch_types::TypeError;
use native_protocol::ProtocolError;
use thiserror::Error;

use crate::exception::RemoteError;
use crate::state::ConnectionState;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport or stream failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Malformed packet.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Type descriptor or value conversion error.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// A column value failed to decode under its declared type.
    #[error("failed to read column {name} of type {type_name}: {source}")]
    Column {
        /// Column name.
        name: String,
        /// Declared type descriptor.
        type_name: String,
        /// Underlying failure.
        #[source]
        source: TypeError,
    },

    /// A row has no column with this name or position.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A row's value count differs from its block's column count.
    #[error("row has {actual} values for {expected} columns")]
    RowWidth {
        /// Column count of the block.
        expected: usize,
        /// Values supplied for the row.
        actual: usize,
    },

    /// The server raised an exception.
    #[error("server exception: {0}")]
    Remote(RemoteError),

    /// A packet arrived where a different one was required.
    #[error("unexpected packet code {code} during {stage}")]
    UnexpectedPacket {
        /// Protocol stage (`handshake`, `ping`).
        stage: &'static str,
        /// Raw packet code.
        code: u64,
    },

    /// The connection has no transport.
    #[error("not connected")]
    NotConnected,

    /// The operation is not valid in the connection's current state.
    #[error("cannot {operation} while connection is {state}")]
    InvalidState {
        /// State the connection was in.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error is transient and may succeed on retry.
    ///
    /// Only transport failures (refused connections, timeouts, resets and
    /// early stream ends) are transient. Server exceptions, malformed
    /// packets and configuration problems are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Codec(e) => e.is_transport(),
            Self::Type(TypeError::Codec(e)) => e.is_transport(),
            Self::Column {
                source: TypeError::Codec(e),
                ..
            } => e.is_transport(),
            Self::NotConnected => true,
            _ => false,
        }
    }

    /// Check if this error is a server exception.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Get the server exception, if this is one.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Get the server error code, if this is a server exception.
    #[must_use]
    pub fn remote_code(&self) -> Option<u64> {
        self.remote().map(|e| e.code)
    }

    /// Check if this error indicates a protocol or decoding problem.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        match self {
            Self::Protocol(_)
            | Self::UnexpectedPacket { .. }
            | Self::Column { .. }
            | Self::RowWidth { .. } => true,
            Self::Codec(CodecError::Protocol(_)) => true,
            _ => false,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        let timeout = Error::Codec(CodecError::Timeout {
            operation: "receive",
            timeout: Duration::from_secs(5),
        });
        assert!(timeout.is_transient());

        let eof = Error::Codec(CodecError::UnexpectedEof { expected: 4 });
        assert!(eof.is_transient());

        let malformed = Error::Codec(CodecError::Protocol(ProtocolError::VarintOverflow));
        assert!(!malformed.is_transient());
        assert!(malformed.is_protocol_error());

        let remote = Error::Remote(RemoteError::new(62, "SYNTAX_ERROR", "bad query"));
        assert!(!remote.is_transient());
        assert!(remote.is_remote());
        assert_eq!(remote.remote_code(), Some(62));

        assert!(!Error::Config("bad".into()).is_transient());
    }

    #[test]
    fn test_column_error_display() {
        let error = Error::Column {
            name: "x".into(),
            type_name: "UInt8".into(),
            source: TypeError::OutOfRange {
                target_type: "UInt8",
                value: "300".into(),
            },
        };
        let text = error.to_string();
        assert!(text.contains("column x"));
        assert!(text.contains("UInt8"));
        assert!(error.is_protocol_error());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_column_transport_failure_is_transient() {
        let error = Error::Column {
            name: "s".into(),
            type_name: "String".into(),
            source: TypeError::Codec(CodecError::UnexpectedEof { expected: 3 }),
        };
        assert!(error.is_transient());
    }

    #[test]
    fn test_row_width_display() {
        let error = Error::RowWidth {
            expected: 2,
            actual: 3,
        };
        assert_eq!(error.to_string(), "row has 3 values for 2 columns");
        assert!(error.is_protocol_error());
        assert!(!error.is_transient());
    }

    #[test]
    fn test_invalid_state_display() {
        let error = Error::InvalidState {
            state: ConnectionState::Poisoned,
            operation: "execute query",
        };
        assert_eq!(
            error.to_string(),
            "cannot execute query while connection is poisoned"
        );
    }
}
