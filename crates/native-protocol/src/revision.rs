//! Protocol revision numbers and the fields they gate.

use core::fmt;

/// Native protocol revision.
///
/// Client and server each announce a revision in their hello packets.
/// Optional fields are only present on the wire when the revision in
/// effect is at least the field's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
    /// Revision announced by this client.
    pub const CLIENT: Self = Self(54429);

    /// Client info block is present in query packets.
    pub const WITH_CLIENT_INFO: Self = Self(54032);

    /// Server hello carries a timezone.
    pub const WITH_SERVER_TIMEZONE: Self = Self(54058);

    /// Client info carries a quota key.
    pub const WITH_QUOTA_KEY_IN_CLIENT_INFO: Self = Self(54060);

    /// Server hello carries a display name.
    pub const WITH_SERVER_DISPLAY_NAME: Self = Self(54372);

    /// Server hello carries a patch version.
    pub const WITH_VERSION_PATCH: Self = Self(54401);

    /// Server can stream log blocks.
    pub const WITH_SERVER_LOGS: Self = Self(54406);

    /// Progress packets carry written rows and bytes.
    pub const WITH_CLIENT_WRITE_INFO: Self = Self(54420);

    /// Settings are serialized as strings.
    pub const WITH_SETTINGS_SERIALIZED_AS_STRINGS: Self = Self(54429);

    /// Query packet carries an interserver secret.
    pub const WITH_INTERSERVER_SECRET: Self = Self(54441);

    /// Query packet carries a parameters section.
    pub const WITH_PARAMETERS: Self = Self(54459);

    /// Create a revision from its wire value.
    #[must_use]
    pub const fn new(revision: u64) -> Self {
        Self(revision)
    }

    /// Get the raw revision value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if no revision is known yet.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    /// Revision a query should carry given the server's announced revision.
    ///
    /// The server revision is used once known; before that the client's own
    /// revision stands in.
    #[must_use]
    pub const fn negotiated(server: Self) -> Self {
        if server.is_unknown() { Self::CLIENT } else { server }
    }

    /// Check if the server hello includes a timezone.
    #[must_use]
    pub const fn has_server_timezone(self) -> bool {
        self.0 >= Self::WITH_SERVER_TIMEZONE.0
    }

    /// Check if the server hello includes a display name.
    #[must_use]
    pub const fn has_server_display_name(self) -> bool {
        self.0 >= Self::WITH_SERVER_DISPLAY_NAME.0
    }

    /// Check if the server hello includes a patch version.
    #[must_use]
    pub const fn has_version_patch(self) -> bool {
        self.0 >= Self::WITH_VERSION_PATCH.0
    }

    /// Check if query packets include an interserver secret.
    #[must_use]
    pub const fn has_interserver_secret(self) -> bool {
        self.0 >= Self::WITH_INTERSERVER_SECRET.0
    }

    /// Check if query packets include a parameters section.
    #[must_use]
    pub const fn has_parameters(self) -> bool {
        self.0 >= Self::WITH_PARAMETERS.0
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
