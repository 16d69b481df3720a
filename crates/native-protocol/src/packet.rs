//! Packet codes.
//!
//! Every packet on the wire starts with a varint code. Client and server
//! use separate code spaces that overlap numerically.

use core::fmt;

use crate::error::ProtocolError;

/// Packet codes sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientCode {
    /// Handshake greeting.
    Hello = 0,
    /// Query submission.
    Query = 1,
    /// Data block (insert payload or end-of-data marker).
    Data = 2,
    /// Cancel the running query. Reserved; the client does not send it.
    Cancel = 3,
    /// Keepalive request.
    Ping = 4,
}

impl ClientCode {
    /// Decode a client code from its wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Hello),
            1 => Ok(Self::Query),
            2 => Ok(Self::Data),
            3 => Ok(Self::Cancel),
            4 => Ok(Self::Ping),
            _ => Err(ProtocolError::UnknownClientCode(value)),
        }
    }

    /// Wire value of this code.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }
}

/// Packet codes sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerCode {
    /// Handshake reply.
    Hello = 0,
    /// Result data block.
    Data = 1,
    /// Server-side exception.
    Exception = 2,
    /// Query progress counters.
    Progress = 3,
    /// Reply to a ping.
    Pong = 4,
    /// All packets for the query have been sent.
    EndOfStream = 5,
    /// Profiling counters.
    ProfileInfo = 6,
    /// Totals block.
    Totals = 7,
    /// Extremes block.
    Extremes = 8,
    /// Reply to a tables status request.
    TablesStatus = 9,
    /// Server log block.
    Log = 10,
    /// Column descriptions for table functions.
    TableColumns = 11,
    /// Profile events block.
    ProfileEvents = 12,
}

impl ServerCode {
    /// Decode a server code from its wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Hello),
            1 => Ok(Self::Data),
            2 => Ok(Self::Exception),
            3 => Ok(Self::Progress),
            4 => Ok(Self::Pong),
            5 => Ok(Self::EndOfStream),
            6 => Ok(Self::ProfileInfo),
            7 => Ok(Self::Totals),
            8 => Ok(Self::Extremes),
            9 => Ok(Self::TablesStatus),
            10 => Ok(Self::Log),
            11 => Ok(Self::TableColumns),
            12 => Ok(Self::ProfileEvents),
            _ => Err(ProtocolError::UnknownServerCode(value)),
        }
    }

    /// Wire value of this code.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "Hello",
            Self::Data => "Data",
            Self::Exception => "Exception",
            Self::Progress => "Progress",
            Self::Pong => "Pong",
            Self::EndOfStream => "EndOfStream",
            Self::ProfileInfo => "ProfileInfo",
            Self::Totals => "Totals",
            Self::Extremes => "Extremes",
            Self::TablesStatus => "TablesStatus",
            Self::Log => "Log",
            Self::TableColumns => "TableColumns",
            Self::ProfileEvents => "ProfileEvents",
        }
    }
}

impl fmt::Display for ServerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
