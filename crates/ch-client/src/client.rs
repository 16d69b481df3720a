//! Application-facing client.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;
use crate::result::QueryResult;
use crate::row::Row;
use crate::server_info::ServerInfo;
use crate::state::ConnectionState;

/// A ClickHouse client over one connection.
///
/// `Client` adds connect retries on top of [`Connection`]. Only transient
/// failures are retried, and only while connecting: server exceptions and
/// protocol errors are returned at once, and queries are never retried.
///
/// # Example
///
/// ```rust,ignore
/// use ch_client::{Client, Config};
///
/// let config = Config::from_connection_string("clickhouse://localhost:9000/default")?;
/// let mut client = Client::connect(config).await?;
/// for row in client.execute("SELECT 1 AS x").await? {
///     let x: u8 = row.get_as("x")?;
/// }
/// client.close().await;
/// ```
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    connection: Connection<S>,
}

impl Client<TcpStream> {
    /// Connect to the first configured host, retrying transient failures.
    ///
    /// Makes up to `1 + retry.max_retries` attempts, sleeping
    /// `retry.retry_timeout` between them.
    pub async fn connect(config: Config) -> Result<Self> {
        let retry = config.retry;
        let mut connection = Connection::new(config);
        let mut attempt = 0;

        loop {
            match connection.connect().await {
                Ok(()) => return Ok(Self { connection }),
                Err(e) if e.is_transient() && retry.should_retry(attempt) => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = retry.max_retries,
                        delay = ?retry.retry_timeout,
                        error = %e,
                        "connect failed; retrying"
                    );
                    tokio::time::sleep(retry.retry_timeout).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Parse a connection string and connect.
    pub async fn connect_str(conn_str: &str) -> Result<Self> {
        Self::connect(Config::from_connection_string(conn_str)?).await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established connection.
    #[must_use]
    pub fn from_connection(connection: Connection<S>) -> Self {
        Self { connection }
    }

    /// Run a query and return its rows.
    pub async fn execute(&mut self, query: &str) -> Result<Vec<Row>> {
        self.connection.execute_query(query, &[]).await
    }

    /// Run a query with extra settings and return its rows.
    pub async fn execute_with_settings(
        &mut self,
        query: &str,
        settings: &[(&str, &str)],
    ) -> Result<Vec<Row>> {
        self.connection.execute_query(query, settings).await
    }

    /// Run a query and return the full result.
    pub async fn query(&mut self, query: &str) -> Result<QueryResult> {
        self.connection.query(query, &[]).await
    }

    /// Run a query with extra settings and return the full result.
    pub async fn query_with_settings(
        &mut self,
        query: &str,
        settings: &[(&str, &str)],
    ) -> Result<QueryResult> {
        self.connection.query(query, settings).await
    }

    /// Check that the server answers.
    pub async fn ping(&mut self) -> bool {
        self.connection.ping().await
    }

    /// Close the connection.
    pub async fn close(&mut self) {
        self.connection.close().await;
    }
}

impl<S> Client<S> {
    /// Server metadata from the handshake.
    #[must_use]
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.connection.server_info()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection<S> {
        &self.connection
    }

    /// Take the underlying connection.
    #[must_use]
    pub fn into_connection(self) -> Connection<S> {
        self.connection
    }
}
