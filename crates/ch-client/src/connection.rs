//! A single native protocol session.
//!
//! A [`Connection`] owns its transport and stream pair exclusively and runs
//! at most one query at a time: `&mut self` on every operation enforces
//! that a query's packets are fully drained before the next is sent.

use ch_codec::{InputStream, OutputStream, Transport};
use native_protocol::{ClientCode, ClientHello, ServerCode, ServerHello};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::query::{QueryRequest, read_exception, receive_result, send_query};
use crate::result::QueryResult;
use crate::row::Row;
use crate::server_info::ServerInfo;
use crate::state::ConnectionState;
use crate::type_cache::TypeCache;

/// A connection to a ClickHouse server.
///
/// Generic over the byte stream so tests can run it over in-memory pipes;
/// production code uses [`TcpStream`].
pub struct Connection<S = TcpStream> {
    config: Config,
    input: InputStream<S>,
    output: OutputStream,
    state: ConnectionState,
    server_info: Option<ServerInfo>,
    types: TypeCache,
}

impl<S> Connection<S> {
    fn with_transport(config: Config, transport: Transport<S>) -> Self {
        let types = TypeCache::new(config.type_cache_capacity);
        Self {
            config,
            input: InputStream::new(transport),
            output: OutputStream::new(),
            state: ConnectionState::Disconnected,
            server_info: None,
            types,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Server metadata from the handshake.
    ///
    /// `None` until a handshake has completed, and again after `close`.
    #[must_use]
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// The configuration this connection was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The per-connection type descriptor cache.
    #[must_use]
    pub fn type_cache(&self) -> &TypeCache {
        &self.types
    }

    fn require_ready(&self, operation: &'static str) -> Result<()> {
        match self.state {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Closed => Err(Error::NotConnected),
            state => Err(Error::InvalidState { state, operation }),
        }
    }
}

impl Connection<TcpStream> {
    /// Create a connection that is not connected yet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let transport = Transport::new(config.timeouts.to_transport());
        Self::with_transport(config, transport)
    }

    /// Create a connection and connect it.
    pub async fn open(config: Config) -> Result<Self> {
        let mut connection = Self::new(config);
        connection.connect().await?;
        Ok(connection)
    }

    /// Open the TCP connection to the first configured host and perform
    /// the handshake.
    ///
    /// Valid from `Disconnected` and `Closed`. On failure the transport is
    /// closed and the connection returns to `Disconnected`, so the call
    /// may be repeated.
    pub async fn connect(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Closed
        ) {
            return Err(Error::InvalidState {
                state: self.state,
                operation: "connect",
            });
        }

        let target = self
            .config
            .primary_host()
            .cloned()
            .ok_or_else(|| Error::Config("no host configured".into()))?;
        if self.config.hosts.len() > 1 {
            tracing::debug!(
                hosts = self.config.hosts.len(),
                "multiple hosts configured; using the first"
            );
        }

        tracing::info!(
            host = %target.host,
            port = target.port,
            database = %self.config.database,
            "connecting to ClickHouse"
        );

        self.state = ConnectionState::Connecting;
        self.input.clear();
        self.output.clear();
        let outcome = match self
            .input
            .transport_mut()
            .connect(&target.host, target.port)
            .await
        {
            Ok(()) => self.handshake().await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = outcome {
            tracing::debug!(error = %e, "connect failed");
            self.input.transport_mut().close().await;
            self.state = ConnectionState::Disconnected;
            return Err(e);
        }
        Ok(())
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Run the handshake over an already connected stream.
    ///
    /// Host and timeouts for connecting are ignored; the send and receive
    /// timeouts still apply.
    pub async fn connect_with_stream(config: Config, stream: S) -> Result<Self> {
        let transport = Transport::from_stream(stream, config.timeouts.to_transport());
        let mut connection = Self::with_transport(config, transport);
        if let Err(e) = connection.handshake().await {
            connection.input.transport_mut().close().await;
            connection.state = ConnectionState::Closed;
            return Err(e);
        }
        Ok(connection)
    }

    async fn handshake(&mut self) -> Result<()> {
        self.state = ConnectionState::Handshaking;

        let hello = ClientHello {
            client_name: self.config.client_name.clone(),
            ..ClientHello::new(
                &self.config.database,
                &self.config.user,
                &self.config.password,
            )
        };
        hello.encode(self.output.buffer_mut());
        self.output.flush(self.input.transport_mut()).await?;
        tracing::debug!(
            client = %hello.client_name,
            revision = %hello.revision,
            user = %hello.user,
            "sent hello"
        );

        let raw = self.input.read_varint().await?;
        match ServerCode::from_u64(raw) {
            Ok(ServerCode::Hello) => {}
            Ok(ServerCode::Exception) => {
                let exception = read_exception(&mut self.input).await?;
                tracing::debug!(code = exception.code, "server refused handshake");
                return Err(Error::Remote(exception));
            }
            _ => {
                return Err(Error::UnexpectedPacket {
                    stage: "handshake",
                    code: raw,
                });
            }
        }

        let hello = self
            .input
            .read_frame(|src| ServerHello::decode(src))
            .await?;
        tracing::debug!(
            revision = %hello.revision,
            timezone = hello.revision.has_server_timezone(),
            display_name = hello.revision.has_server_display_name(),
            version_patch = hello.revision.has_version_patch(),
            "server hello fields present"
        );

        let info = ServerInfo::from(hello);
        tracing::info!(
            server = %info.name,
            version = ?info.version(),
            revision = %info.revision,
            timezone = %info.timezone,
            "connected"
        );
        if self.config.compression {
            tracing::warn!(
                "compression requested; compressed blocks from the server cannot be decoded"
            );
        }

        self.server_info = Some(info);
        self.state = ConnectionState::Ready;
        Ok(())
    }

    /// Check that the server answers.
    ///
    /// Sends PING and requires the next packet to be PONG. Every failure,
    /// including not being connected, yields `false`. A failure after the
    /// PING went out poisons the connection.
    pub async fn ping(&mut self) -> bool {
        if self.require_ready("ping").is_err() {
            tracing::debug!(state = %self.state, "ping skipped");
            return false;
        }

        match self.exchange_ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "ping failed");
                self.state = ConnectionState::Poisoned;
                false
            }
        }
    }

    async fn exchange_ping(&mut self) -> Result<()> {
        self.output.write_varint(ClientCode::Ping.as_u64());
        self.output.flush(self.input.transport_mut()).await?;
        tracing::debug!("sent ping");

        let raw = self.input.read_varint().await?;
        if raw == ServerCode::Pong.as_u64() {
            Ok(())
        } else {
            Err(Error::UnexpectedPacket {
                stage: "ping",
                code: raw,
            })
        }
    }

    /// Run a query and return the rows of every data block, in order.
    ///
    /// `settings` are sent after the configured default settings. A server
    /// exception fails the call with [`Error::Remote`] and leaves the
    /// connection ready.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let rows = conn.execute_query("SELECT number FROM system.numbers LIMIT 3", &[]).await?;
    /// ```
    pub async fn execute_query(
        &mut self,
        text: &str,
        settings: &[(&str, &str)],
    ) -> Result<Vec<Row>> {
        Ok(self.query(text, settings).await?.into_rows())
    }

    /// Run a query and return everything the server sent back.
    ///
    /// Fails with the server exception if the query raised one. A transport
    /// or decode failure poisons the connection.
    pub async fn query(
        &mut self,
        text: &str,
        settings: &[(&str, &str)],
    ) -> Result<QueryResult> {
        self.require_ready("execute query")?;
        self.state = ConnectionState::Executing;

        let revision = self
            .server_info
            .as_ref()
            .map_or(native_protocol::Revision::CLIENT, ServerInfo::negotiated_revision);
        let request = QueryRequest {
            text,
            user: &self.config.user,
            revision,
            compression: self.config.compression,
            default_settings: &self.config.settings,
            settings,
        };

        let outcome = match send_query(request, &mut self.input, &mut self.output).await {
            Ok(()) => receive_result(&mut self.input, &mut self.types).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                self.state = ConnectionState::Ready;
                result.into_result()
            }
            Err(e) => {
                tracing::debug!(error = %e, "query failed; poisoning connection");
                self.state = ConnectionState::Poisoned;
                Err(e)
            }
        }
    }

    /// Close the transport and drop buffered bytes.
    ///
    /// Valid from every state and idempotent.
    pub async fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            tracing::debug!(state = %self.state, "closing connection");
        }
        self.input.transport_mut().close().await;
        self.input.clear();
        self.output.clear();
        self.server_info = None;
        self.state = ConnectionState::Closed;
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("server_info", &self.server_info)
            .field("types", &self.types)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ch_testing::ServerPackets;
    use native_protocol::Revision;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    fn server_hello() -> ServerHello {
        ServerHello {
            name: "ClickHouse".into(),
            version_major: 23,
            version_minor: 8,
            revision: Revision::CLIENT,
            timezone: "UTC".into(),
            display_name: "test".into(),
            version_patch: 1,
        }
    }

    /// Connect over a duplex pipe whose server side has already queued
    /// `replies`.
    async fn connected(replies: &[u8]) -> (Connection<DuplexStream>, DuplexStream) {
        let (client, mut server) = duplex(64 * 1024);
        let hello = ServerPackets::new().hello(&server_hello()).build();
        server.write_all(&hello).await.unwrap();
        server.write_all(replies).await.unwrap();
        let connection = Connection::connect_with_stream(Config::default(), client)
            .await
            .unwrap();
        (connection, server)
    }

    #[tokio::test]
    async fn test_handshake_over_stream() {
        let (connection, mut server) = connected(&[]).await;
        assert_eq!(connection.state(), ConnectionState::Ready);
        assert_eq!(connection.server_info().unwrap().display_name, "test");

        // The client hello went out first.
        let mut code = [0u8; 1];
        server.read_exact(&mut code).await.unwrap();
        assert_eq!(code[0], ClientCode::Hello as u8);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let pong = ServerPackets::new().pong().build();
        let (mut connection, _server) = connected(&pong).await;
        assert!(connection.ping().await);
        assert_eq!(connection.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_ping_wrong_packet_poisons() {
        let reply = ServerPackets::new().end_of_stream().build();
        let (mut connection, _server) = connected(&reply).await;
        assert!(!connection.ping().await);
        assert_eq!(connection.state(), ConnectionState::Poisoned);
        assert!(!connection.ping().await);
    }

    #[tokio::test]
    async fn test_ping_after_close_is_false() {
        let (mut connection, _server) = connected(&[]).await;
        connection.close().await;
        assert!(!connection.ping().await);
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_query_on_poisoned_connection() {
        let reply = ServerPackets::new().end_of_stream().build();
        let (mut connection, _server) = connected(&reply).await;
        connection.ping().await;

        let err = connection.execute_query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                state: ConnectionState::Poisoned,
                ..
            }
        ));

        connection.close().await;
        assert!(matches!(
            connection.execute_query("SELECT 1", &[]).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_unconnected_query_fails() {
        let mut connection = Connection::new(Config::default());
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(matches!(
            connection.query("SELECT 1", &[]).await,
            Err(Error::NotConnected)
        ));
        assert!(!connection.ping().await);
        connection.close().await;
        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_handshake_unexpected_packet() {
        let (client, mut server) = duplex(1024);
        server
            .write_all(&ServerPackets::new().pong().build())
            .await
            .unwrap();
        let err = Connection::connect_with_stream(Config::default(), client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedPacket {
                stage: "handshake",
                code: 4
            }
        ));
    }
}
