//! Handshake packets.
//!
//! The client opens every session with a [`ClientHello`]; the server replies
//! with a [`ServerHello`] (or an exception). Optional server fields are
//! gated on the revision the server itself announces.

use core::fmt;

use bytes::{Buf, BufMut};

use crate::codec::{get_string, get_varint, put_string, put_varint};
use crate::error::ProtocolError;
use crate::packet::{ClientCode, ServerCode};
use crate::revision::Revision;

/// Client name announced in the hello packet.
pub const CLIENT_HELLO_NAME: &str = "ClickHouse client";

/// Client major version announced in the hello packet.
pub const CLIENT_VERSION_MAJOR: u64 = 1;

/// Client minor version announced in the hello packet.
pub const CLIENT_VERSION_MINOR: u64 = 0;

/// Client greeting.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Client software name.
    pub client_name: String,
    /// Client major version.
    pub version_major: u64,
    /// Client minor version.
    pub version_minor: u64,
    /// Protocol revision the client speaks.
    pub revision: Revision,
    /// Default database for the session.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password in clear text.
    pub password: String,
}

impl ClientHello {
    /// Create a hello with this client's identity.
    #[must_use]
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_name: CLIENT_HELLO_NAME.to_string(),
            version_major: CLIENT_VERSION_MAJOR,
            version_minor: CLIENT_VERSION_MINOR,
            revision: Revision::CLIENT,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Write the packet, code included.
    pub fn encode(&self, dst: &mut impl BufMut) {
        put_varint(dst, ClientCode::Hello.as_u64());
        put_string(dst, &self.client_name);
        put_varint(dst, self.version_major);
        put_varint(dst, self.version_minor);
        put_varint(dst, self.revision.raw());
        put_string(dst, &self.database);
        put_string(dst, &self.user);
        put_string(dst, &self.password);
    }

    /// Read the packet body; the code has already been consumed.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            client_name: get_string(src)?,
            version_major: get_varint(src)?,
            version_minor: get_varint(src)?,
            revision: Revision::new(get_varint(src)?),
            database: get_string(src)?,
            user: get_string(src)?,
            password: get_string(src)?,
        })
    }
}

impl fmt::Debug for ClientHello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHello")
            .field("client_name", &self.client_name)
            .field("version_major", &self.version_major)
            .field("version_minor", &self.version_minor)
            .field("revision", &self.revision)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Server greeting.
///
/// Fields the server's revision predates are left empty (or zero).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHello {
    /// Server software name.
    pub name: String,
    /// Server major version.
    pub version_major: u64,
    /// Server minor version.
    pub version_minor: u64,
    /// Protocol revision the server speaks.
    pub revision: Revision,
    /// Server timezone.
    pub timezone: String,
    /// Human-readable server name.
    pub display_name: String,
    /// Server patch version.
    pub version_patch: u64,
}

impl ServerHello {
    /// Write the packet, code included, omitting fields the revision predates.
    pub fn encode(&self, dst: &mut impl BufMut) {
        put_varint(dst, ServerCode::Hello.as_u64());
        put_string(dst, &self.name);
        put_varint(dst, self.version_major);
        put_varint(dst, self.version_minor);
        put_varint(dst, self.revision.raw());
        if self.revision.has_server_timezone() {
            put_string(dst, &self.timezone);
        }
        if self.revision.has_server_display_name() {
            put_string(dst, &self.display_name);
        }
        if self.revision.has_version_patch() {
            put_varint(dst, self.version_patch);
        }
    }

    /// Read the packet body; the code has already been consumed.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let mut hello = Self {
            name: get_string(src)?,
            version_major: get_varint(src)?,
            version_minor: get_varint(src)?,
            revision: Revision::new(get_varint(src)?),
            ..Self::default()
        };
        if hello.revision.has_server_timezone() {
            hello.timezone = get_string(src)?;
        }
        if hello.revision.has_server_display_name() {
            hello.display_name = get_string(src)?;
        }
        if hello.revision.has_version_patch() {
            hello.version_patch = get_varint(src)?;
        }
        Ok(hello)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_client_hello_layout() {
        let hello = ClientHello::new("default", "default", "");
        let mut buf = BytesMut::new();
        hello.encode(&mut buf);

        let mut expected = vec![0u8, 17];
        expected.extend_from_slice(b"ClickHouse client");
        expected.extend_from_slice(&[1, 0, 0x9d, 0xa9, 0x03]);
        expected.push(7);
        expected.extend_from_slice(b"default");
        expected.push(7);
        expected.extend_from_slice(b"default");
        expected.push(0);
        assert_eq!(&buf[..], &expected[..]);
    }

    #[test]
    fn test_client_hello_decode() {
        let hello = ClientHello::new("analytics", "reader", "secret");
        let mut buf = BytesMut::new();
        hello.encode(&mut buf);

        let mut cursor = &buf[1..];
        assert_eq!(ClientHello::decode(&mut cursor).unwrap(), hello);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_client_hello_debug_redacts_password() {
        let hello = ClientHello::new("db", "user", "hunter2");
        let debug = format!("{hello:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_server_hello_old_revision_omits_optional_fields() {
        let hello = ServerHello {
            name: "ClickHouse".into(),
            version_major: 1,
            version_minor: 1,
            revision: Revision::new(54000),
            timezone: "UTC".into(),
            display_name: "ignored".into(),
            version_patch: 9,
        };
        let mut buf = BytesMut::new();
        hello.encode(&mut buf);

        let mut cursor = &buf[1..];
        let decoded = ServerHello::decode(&mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(decoded.timezone, "");
        assert_eq!(decoded.display_name, "");
        assert_eq!(decoded.version_patch, 0);
    }

    #[test]
    fn test_server_hello_modern_revision() {
        let hello = ServerHello {
            name: "ClickHouse".into(),
            version_major: 23,
            version_minor: 8,
            revision: Revision::new(54460),
            timezone: "Europe/Berlin".into(),
            display_name: "ch-01".into(),
            version_patch: 4,
        };
        let mut buf = BytesMut::new();
        hello.encode(&mut buf);

        let mut cursor = &buf[1..];
        assert_eq!(ServerHello::decode(&mut cursor).unwrap(), hello);
    }

    #[test]
    fn test_server_hello_truncated() {
        let mut cursor: &[u8] = &[10, b'C', b'l'];
        assert!(ServerHello::decode(&mut cursor).unwrap_err().is_incomplete());
    }
}
