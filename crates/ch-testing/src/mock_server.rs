//! Mock ClickHouse server for unit testing.
//!
//! This module provides a mock server speaking the native protocol, for
//! testing the client without a real database instance.
//!
//! ## Features
//!
//! - Handshake with a configurable server hello (or a refusal)
//! - Configurable responses per query text
//! - PING/PONG
//! - Multiple concurrent connections
//! - Every received query packet is recorded for inspection
//!
//! ## Example
//!
//! ```rust,ignore
//! use ch_testing::mock_server::{MockClickHouseServer, MockColumn, MockResponse};
//! use ch_types::Value;
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let server = MockClickHouseServer::builder()
//!         .with_response(
//!             "SELECT 1",
//!             MockResponse::scalar(MockColumn::uint8("1"), Value::UInt8(1)),
//!         )
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // Connect your client to addr...
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ch_codec::{CodecError, InputStream, OutputStream, Transport, TransportTimeouts};
use ch_types::{TypeError, Value};
use native_protocol::{
    ClientPacket, ExceptionPacket, QueryPacket, Revision, ServerCode, ServerHello, encode_code,
};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast};

use crate::packets::{MockColumn, ServerPackets};

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport or framing error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Response rows do not fit their columns.
    #[error("response encoding error: {0}")]
    Type(#[from] TypeError),

    /// Client violated the expected packet sequence.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// Return rows: a header-only block, one block with the rows, progress,
    /// profile info and end of stream.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Row data.
        rows: Vec<Vec<Value>>,
    },

    /// Return a server exception.
    Error(ExceptionPacket),

    /// Return end of stream only.
    Empty,

    /// Return raw pre-encoded packets.
    Raw(Bytes),

    /// Build the response from the query text.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", rows)
                .finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Raw(data) => f.debug_tuple("Raw").field(&data.len()).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Create a single-column, single-row response.
    pub fn scalar(column: MockColumn, value: impl Into<Value>) -> Self {
        Self::Rows {
            columns: vec![column],
            rows: vec![vec![value.into()]],
        }
    }

    /// Create a multi-row response.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Create an empty result response.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create an exception response.
    pub fn error(code: u64, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ExceptionPacket {
            code,
            name: name.into(),
            message: message.into(),
            ..ExceptionPacket::default()
        })
    }

    /// Create a response computed from the query text.
    pub fn custom(handler: impl Fn(&str) -> MockResponse + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }

    /// Encode the packets this response streams back for `query`.
    pub fn encode(&self, query: &str) -> Result<Bytes> {
        let packets = match self {
            Self::Rows { columns, rows } => {
                let count = rows.len() as u64;
                ServerPackets::new()
                    .data(columns, &[])?
                    .data(columns, rows)?
                    .progress(count, 0, count)
                    .profile_info(count, 0, 0.0)
                    .end_of_stream()
            }
            Self::Error(exception) => ServerPackets::new().exception(exception),
            Self::Empty => ServerPackets::new().end_of_stream(),
            Self::Raw(data) => return Ok(data.clone()),
            Self::Custom(handler) => return handler(query).encode(query),
        };
        Ok(packets.build())
    }
}

/// Configuration for the mock server.
pub struct MockServerConfig {
    /// Pre-configured responses for specific queries.
    responses: HashMap<String, MockResponse>,
    /// Default response for unmatched queries.
    default_response: MockResponse,
    /// Hello sent after the client's greeting.
    hello: ServerHello,
    /// Exception sent instead of the hello, refusing the handshake.
    hello_exception: Option<ExceptionPacket>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: MockResponse::empty(),
            hello: ServerHello {
                name: "ClickHouse".to_string(),
                version_major: 23,
                version_minor: 8,
                revision: Revision::CLIENT,
                timezone: "UTC".to_string(),
                display_name: "mock".to_string(),
                version_patch: 1,
            },
            hello_exception: None,
        }
    }
}

/// Builder for `MockClickHouseServer`.
#[derive(Default)]
pub struct MockServerBuilder {
    config: MockServerConfig,
}

impl MockServerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for a specific query.
    pub fn with_response(mut self, query: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(query.into(), response);
        self
    }

    /// Set the default response for unmatched queries.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.config.default_response = response;
        self
    }

    /// Set the server name reported in the hello.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.config.hello.name = name.into();
        self
    }

    /// Set the server version reported in the hello.
    pub fn with_version(mut self, major: u64, minor: u64, patch: u64) -> Self {
        self.config.hello.version_major = major;
        self.config.hello.version_minor = minor;
        self.config.hello.version_patch = patch;
        self
    }

    /// Set the protocol revision reported in the hello.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.config.hello.revision = revision;
        self
    }

    /// Set the timezone reported in the hello.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.hello.timezone = timezone.into();
        self
    }

    /// Set the display name reported in the hello.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.config.hello.display_name = name.into();
        self
    }

    /// Refuse every handshake with this exception.
    pub fn with_hello_exception(mut self, exception: ExceptionPacket) -> Self {
        self.config.hello_exception = Some(exception);
        self
    }

    /// Build and start the mock server.
    pub async fn build(self) -> Result<MockClickHouseServer> {
        MockClickHouseServer::start(self.config).await
    }
}

/// State shared between the accept loop and connection tasks.
struct Shared {
    config: MockServerConfig,
    connection_count: Mutex<usize>,
    queries: Mutex<Vec<QueryPacket>>,
}

/// A mock ClickHouse server for testing.
///
/// It completes the handshake and answers queries from pre-configured
/// responses. CANCEL packets are accepted and ignored.
pub struct MockClickHouseServer {
    /// Server address.
    addr: SocketAddr,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    shared: Arc<Shared>,
}

impl MockClickHouseServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start the mock server on an available port.
    pub async fn start(config: MockServerConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let shared = Arc::new(Shared {
            config,
            connection_count: Mutex::new(0),
            queries: Mutex::new(Vec::new()),
        });

        let server = Self {
            addr,
            shutdown_tx: shutdown_tx.clone(),
            shared: shared.clone(),
        };

        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _peer_addr)) => {
                                let shared = shared.clone();
                                tokio::spawn(async move {
                                    *shared.connection_count.lock().await += 1;
                                    if let Err(e) = handle_connection(stream, &shared).await {
                                        tracing::debug!("Connection error: {}", e);
                                    }
                                    let mut count = shared.connection_count.lock().await;
                                    *count = count.saturating_sub(1);
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Ok(server)
    }

    /// Get the server's listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the host string for connection configuration.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get the current connection count.
    pub async fn connection_count(&self) -> usize {
        *self.shared.connection_count.lock().await
    }

    /// Query packets received so far, across all connections.
    pub async fn received_queries(&self) -> Vec<QueryPacket> {
        self.shared.queries.lock().await.clone()
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockClickHouseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read the next client packet; `None` once the client has closed.
pub(crate) async fn read_client_packet(
    input: &mut InputStream<TcpStream>,
) -> std::result::Result<Option<ClientPacket>, CodecError> {
    if input.at_end().await? {
        return Ok(None);
    }
    input.read_frame(|src| ClientPacket::decode(src)).await.map(Some)
}

/// Server side transport: the client may stay idle indefinitely.
pub(crate) fn server_transport(stream: TcpStream) -> InputStream<TcpStream> {
    let timeouts = TransportTimeouts::default().receive(Duration::ZERO);
    InputStream::new(Transport::from_stream(stream, timeouts))
}

/// Handle a single client connection.
async fn handle_connection(stream: TcpStream, shared: &Shared) -> Result<()> {
    let config = &shared.config;
    let mut input = server_transport(stream);
    let mut output = OutputStream::new();

    // Step 1: handshake
    let hello = match read_client_packet(&mut input).await? {
        Some(ClientPacket::Hello(hello)) => hello,
        Some(other) => {
            return Err(MockServerError::Protocol(format!(
                "expected Hello, got {:?}",
                other.code()
            )));
        }
        None => return Ok(()),
    };
    tracing::debug!(
        client = %hello.client_name,
        user = %hello.user,
        database = %hello.database,
        revision = %hello.revision,
        "mock server received hello"
    );

    if let Some(exception) = &config.hello_exception {
        exception.encode(output.buffer_mut());
        output.flush(input.transport_mut()).await?;
        return Ok(());
    }
    config.hello.encode(output.buffer_mut());
    output.flush(input.transport_mut()).await?;

    // Step 2: queries and pings until the client closes
    while let Some(packet) = read_client_packet(&mut input).await? {
        match packet {
            ClientPacket::Query(query) => {
                let response = find_response(&query.query, config);
                let bytes = response.encode(&query.query)?;
                shared.queries.lock().await.push(*query);
                output.write_bytes(&bytes);
                output.flush(input.transport_mut()).await?;
            }
            ClientPacket::Ping => {
                encode_code(output.buffer_mut(), ServerCode::Pong);
                output.flush(input.transport_mut()).await?;
            }
            ClientPacket::Cancel => {
                tracing::debug!("mock server ignoring cancel");
            }
            other => {
                tracing::debug!("Unexpected packet: {:?}", other.code());
            }
        }
    }

    Ok(())
}

/// Find the response for a query.
fn find_response<'a>(query: &str, config: &'a MockServerConfig) -> &'a MockResponse {
    // Check exact match first
    if let Some(response) = config.responses.get(query) {
        return response;
    }

    // Check case-insensitive match
    let normalized = query.trim().to_uppercase();
    for (key, response) in &config.responses {
        if key.trim().to_uppercase() == normalized {
            return response;
        }
    }

    &config.default_response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockClickHouseServer::builder()
            .with_server_name("TestServer")
            .build()
            .await
            .unwrap();

        assert!(server.port() > 0);
        assert_eq!(server.host(), "127.0.0.1");
    }

    #[test]
    fn test_find_response_case_insensitive() {
        let config = MockServerBuilder::new()
            .with_response("SELECT 1", MockResponse::error(60, "Test", "first"))
            .config;
        match find_response("  select 1 ", &config) {
            MockResponse::Error(e) => assert_eq!(e.code, 60),
            other => panic!("expected error response, got {other:?}"),
        }
        assert!(matches!(
            find_response("SELECT 2", &config),
            MockResponse::Empty
        ));
    }

    #[test]
    fn test_rows_response_packet_sequence() {
        let response = MockResponse::scalar(MockColumn::uint8("x"), 1u8);
        let bytes = response.encode("SELECT 1").unwrap();
        // header-only DATA block first
        assert_eq!(bytes[0], ServerCode::Data as u8);
        // PROGRESS(1, 0, 1), PROFILE_INFO(1, 0, 0), END_OF_STREAM
        assert!(bytes.ends_with(&[3, 1, 0, 1, 6, 1, 0, 0, 5]));
    }

    #[test]
    fn test_custom_response_sees_query() {
        let response = MockResponse::custom(|query| {
            MockResponse::error(1, "Echo", query.to_string())
        });
        let bytes = response.encode("SELECT echo").unwrap();
        assert_eq!(bytes[0], ServerCode::Exception as u8);
        assert!(bytes.windows(11).any(|w| w == b"SELECT echo"));
    }
}
