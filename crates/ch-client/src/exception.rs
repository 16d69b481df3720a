//! Server-side exceptions.

use std::fmt;

use native_protocol::ExceptionPacket;

/// An exception raised by the server, with its cause chain.
///
/// The chain mirrors server-side exception nesting: `nested` holds the
/// exception that caused this one, and [`std::error::Error::source`] walks
/// it the same way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteError {
    /// Server error code (for example 62 for a syntax error).
    pub code: u64,
    /// Exception class name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Server-side stack trace text.
    pub stack_trace: String,
    /// Causing exception, if any.
    pub nested: Option<Box<RemoteError>>,
}

impl RemoteError {
    /// Create an exception with no stack trace and no cause.
    pub fn new(code: u64, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// The error recorded when the stream ends inside an exception body.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(0, "UnknownException", "Failed to read exception from server")
    }

    /// Attach a causing exception.
    #[must_use]
    pub fn with_nested(mut self, nested: RemoteError) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// Iterate over this exception and its causes, outermost first.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of exceptions in the chain, including this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// The innermost exception of the chain.
    #[must_use]
    pub fn root_cause(&self) -> &RemoteError {
        self.chain().last().unwrap_or(self)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: {}. {}: {}", self.code, self.name, self.message)
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.nested
            .as_deref()
            .map(|nested| nested as &(dyn std::error::Error + 'static))
    }
}

impl From<ExceptionPacket> for RemoteError {
    fn from(packet: ExceptionPacket) -> Self {
        Self {
            code: packet.code,
            name: packet.name,
            message: packet.message,
            stack_trace: packet.stack_trace,
            nested: packet.nested.map(|nested| Box::new((*nested).into())),
        }
    }
}

/// Iterator over a [`RemoteError`] cause chain.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a RemoteError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a RemoteError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.nested.as_deref();
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn nested_packet() -> ExceptionPacket {
        ExceptionPacket {
            code: 47,
            name: "DB::Exception".into(),
            message: "outer".into(),
            stack_trace: "0. frame".into(),
            nested: Some(Box::new(ExceptionPacket {
                code: 60,
                name: "DB::Exception".into(),
                message: "inner".into(),
                ..ExceptionPacket::default()
            })),
        }
    }

    #[test]
    fn test_from_packet_keeps_chain() {
        let error = RemoteError::from(nested_packet());
        assert_eq!(error.code, 47);
        assert_eq!(error.stack_trace, "0. frame");
        assert_eq!(error.depth(), 2);
        assert_eq!(error.root_cause().message, "inner");

        let codes: Vec<u64> = error.chain().map(|e| e.code).collect();
        assert_eq!(codes, vec![47, 60]);
    }

    #[test]
    fn test_source_walks_nested() {
        let error = RemoteError::from(nested_packet());
        let source = error.source().unwrap();
        assert!(source.to_string().contains("inner"));
        assert!(source.source().is_none());
    }

    #[test]
    fn test_display() {
        let error = RemoteError::new(62, "SYNTAX_ERROR", "bad query");
        assert_eq!(error.to_string(), "Code: 62. SYNTAX_ERROR: bad query");
    }

    #[test]
    fn test_unknown_fallback() {
        let error = RemoteError::unknown();
        assert_eq!(error.code, 0);
        assert_eq!(error.name, "UnknownException");
        assert_eq!(error.message, "Failed to read exception from server");
        assert!(error.nested.is_none());
    }
}
