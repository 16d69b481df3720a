//! Test fixture utilities.

use crate::packets::MockColumn;

/// Connection settings for a live server, read from the environment.
///
/// Variables: `CLICKHOUSE_HOST` (required), `CLICKHOUSE_PORT`,
/// `CLICKHOUSE_USER`, `CLICKHOUSE_PASSWORD`, `CLICKHOUSE_DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveServer {
    /// Host name.
    pub host: String,
    /// Native protocol port.
    pub port: u16,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Database.
    pub database: String,
}

impl LiveServer {
    /// Read settings from the environment; `None` when no host is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("CLICKHOUSE_HOST").ok()?;
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Some(Self {
            host,
            port: var("CLICKHOUSE_PORT", "9000").parse().unwrap_or(9000),
            user: var("CLICKHOUSE_USER", "default"),
            password: var("CLICKHOUSE_PASSWORD", ""),
            database: var("CLICKHOUSE_DATABASE", "default"),
        })
    }
}

/// Test database fixture for setting up and tearing down test data.
#[derive(Debug, Clone)]
pub struct TestFixture {
    /// Database name.
    pub database: String,
    /// Tables created by this fixture, with their columns.
    pub tables: Vec<(String, Vec<MockColumn>)>,
}

impl TestFixture {
    /// Create a new test fixture.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table to the fixture.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<MockColumn>) -> Self {
        self.tables.push((table.into(), columns));
        self
    }

    /// Generate SQL to create the test database.
    #[must_use]
    pub fn create_database_sql(&self) -> String {
        format!("CREATE DATABASE IF NOT EXISTS `{}`", self.database)
    }

    /// Generate SQL to create every fixture table.
    #[must_use]
    pub fn create_tables_sql(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|(table, columns)| {
                let columns = columns
                    .iter()
                    .map(|c| format!("`{}` {}", c.name, c.type_name))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "CREATE TABLE IF NOT EXISTS `{}`.`{table}` ({columns}) ENGINE = Memory",
                    self.database
                )
            })
            .collect()
    }

    /// Generate SQL to drop the test database.
    #[must_use]
    pub fn drop_database_sql(&self) -> String {
        format!("DROP DATABASE IF EXISTS `{}`", self.database)
    }
}
