//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while encoding or decoding native protocol frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The buffer ended before the value was complete.
    ///
    /// Stream readers treat this as "read more"; buffer-level decoders
    /// surface it so callers can retry once more bytes have arrived.
    #[error("incomplete data: needed at least {needed} more bytes")]
    Incomplete {
        /// Minimum number of additional bytes required.
        needed: usize,
    },

    /// A varint ran past ten bytes or past 64 bits of payload.
    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    /// A string field did not hold valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A length prefix does not fit in memory on this platform.
    #[error("length prefix too large: {0}")]
    LengthOverflow(u64),

    /// Unrecognized client packet code.
    #[error("unknown client packet code: {0}")]
    UnknownClientCode(u64),

    /// Unrecognized server packet code.
    #[error("unknown server packet code: {0}")]
    UnknownServerCode(u64),

    /// Block info section contained an unknown field tag.
    #[error("unknown block info field: {0}")]
    UnknownBlockInfoField(u64),

    /// A specific packet was required but a different one arrived.
    #[error("unexpected packet: expected {expected}, got code {actual}")]
    UnexpectedPacket {
        /// Packet that was expected.
        expected: &'static str,
        /// Raw packet code that arrived.
        actual: u64,
    },

    /// A field held a value outside its allowed domain.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

impl ProtocolError {
    /// Check whether more input could resolve this error.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}
