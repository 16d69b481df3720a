//! ClickHouse container support via testcontainers.

use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Native protocol port inside the container.
pub const NATIVE_PORT: u16 = 9000;

/// ClickHouse server container image.
///
/// Uses the official `clickhouse/clickhouse-server` image.
#[derive(Debug, Clone)]
pub struct ClickHouseContainer {
    /// User created at startup.
    pub user: String,
    /// Password for that user.
    pub password: String,
    /// Database created at startup.
    pub database: String,
    /// Container tag (version).
    pub tag: String,
}

impl Default for ClickHouseContainer {
    fn default() -> Self {
        Self {
            user: "default".to_string(),
            password: "Password123".to_string(),
            database: "default".to_string(),
            tag: "23.8".to_string(),
        }
    }
}

impl ClickHouseContainer {
    /// Create a new ClickHouse container configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user name.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the user's password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database created at startup.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the container tag (ClickHouse version).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Image for ClickHouseContainer {
    fn name(&self) -> &str {
        "clickhouse/clickhouse-server"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![
            WaitFor::message_on_stderr("Ready for connections"),
            WaitFor::seconds(1),
        ]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        vec![
            ("CLICKHOUSE_USER", self.user.as_str()),
            ("CLICKHOUSE_PASSWORD", self.password.as_str()),
            ("CLICKHOUSE_DB", self.database.as_str()),
            ("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1"),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(NATIVE_PORT)]
    }
}
