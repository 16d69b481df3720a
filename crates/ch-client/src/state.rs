//! Connection lifecycle states.
//!
//! A connection moves `Disconnected -> Connecting -> Handshaking -> Ready`,
//! then loops `Ready -> Executing -> Ready` once per query, and ends in
//! `Closed`. A transport or protocol failure while a query or ping is in
//! flight leaves the session at an unknown position in the byte stream, so
//! the connection is parked in `Poisoned` until the caller closes it.

use std::fmt;

/// Lifecycle state of a [`Connection`](crate::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport attached yet.
    #[default]
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Hello exchange in progress.
    Handshaking,
    /// Idle and able to run a query.
    Ready,
    /// A query's packet stream is being drained.
    Executing,
    /// Broken by a mid-operation failure; must be closed.
    Poisoned,
    /// Closed; terminal.
    Closed,
}

impl ConnectionState {
    /// Check if a query can be started.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if a query or connect is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Handshaking | Self::Executing)
    }

    /// Check if the connection can never be used again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Poisoned | Self::Closed)
    }

    /// Lowercase state name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Poisoned => "poisoned",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Ready.is_usable());
        assert!(!ConnectionState::Executing.is_usable());
        assert!(ConnectionState::Executing.is_busy());
        assert!(!ConnectionState::Ready.is_busy());
        assert!(ConnectionState::Poisoned.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Handshaking.to_string(), "handshaking");
    }
}
