//! Type conversion error types.

use ch_codec::CodecError;
use thiserror::Error;

/// Errors that can occur while parsing type descriptors or converting values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// Descriptor does not name a supported type.
    #[error("unknown data type: {0:?}")]
    UnknownType(String),

    /// Descriptor has unbalanced or misplaced parentheses.
    #[error("malformed type descriptor: {0:?}")]
    MalformedDescriptor(String),

    /// Composite type received the wrong number of arguments.
    #[error("{type_name} expects {expected} arguments, got {actual}")]
    InvalidArguments {
        /// Composite type name.
        type_name: &'static str,
        /// Required argument count.
        expected: usize,
        /// Argument count found.
        actual: usize,
    },

    /// Tuple value arity does not match the tuple type.
    #[error("tuple arity mismatch: type has {expected} elements, value has {actual}")]
    TupleArity {
        /// Element count of the type.
        expected: usize,
        /// Element count of the value.
        actual: usize,
    },

    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Value kind does not match the column type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual value kind.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value {value} out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
        /// Offending value, rendered.
        value: String,
    },

    /// Day or second count does not map to a calendar value.
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Reading the value from the stream failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl TypeError {
    /// Check if the underlying stream failed rather than the value.
    #[must_use]
    pub fn is_codec(&self) -> bool {
        matches!(self, Self::Codec(_))
    }
}
