//! Server identity from the handshake.

use std::fmt;

use native_protocol::{Revision, ServerHello};

/// Server metadata captured once during the handshake.
///
/// Fields gated on a revision the server does not reach are left empty
/// (`timezone`, `display_name`) or zero (`version_patch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server product name.
    pub name: String,
    /// Major version.
    pub version_major: u64,
    /// Minor version.
    pub version_minor: u64,
    /// Patch version.
    pub version_patch: u64,
    /// Protocol revision the server speaks.
    pub revision: Revision,
    /// Server timezone.
    pub timezone: String,
    /// Server display name.
    pub display_name: String,
}

impl ServerInfo {
    /// Version as a `(major, minor, patch)` triple.
    #[must_use]
    pub fn version(&self) -> (u64, u64, u64) {
        (self.version_major, self.version_minor, self.version_patch)
    }

    /// Revision queries on this connection carry.
    #[must_use]
    pub fn negotiated_revision(&self) -> Revision {
        Revision::negotiated(self.revision)
    }
}

impl From<ServerHello> for ServerInfo {
    fn from(hello: ServerHello) -> Self {
        Self {
            name: hello.name,
            version_major: hello.version_major,
            version_minor: hello.version_minor,
            version_patch: hello.version_patch,
            revision: hello.revision,
            timezone: hello.timezone,
            display_name: hello.display_name,
        }
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} (revision {})",
            self.name, self.version_major, self.version_minor, self.version_patch, self.revision
        )
    }
}
