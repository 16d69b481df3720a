//! Client tests against the mock ClickHouse server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::{Duration, Instant};

use ch_client::{
    Client, Config, Connection, ConnectionState, Error, RetryPolicy, Revision, TimeoutConfig, Value,
};
use ch_testing::{MockClickHouseServer, MockColumn, MockResponse};
use chrono::{NaiveDate, TimeZone, Utc};
use native_protocol::ExceptionPacket;

fn config_for(server: &MockClickHouseServer) -> Config {
    Config::new()
        .with_host(server.host())
        .with_port(server.port())
        .with_retry(RetryPolicy::no_retry())
}

// ============================================================================
// Connect and Retry
// ============================================================================

#[tokio::test]
async fn test_connect_reports_server_info() {
    let server = MockClickHouseServer::builder()
        .with_server_name("ClickHouse")
        .with_version(24, 3, 2)
        .with_timezone("Asia/Tokyo")
        .with_display_name("ch-test")
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    let info = client.server_info().unwrap();
    assert_eq!(info.version(), (24, 3, 2));
    assert_eq!(info.timezone, "Asia/Tokyo");
    assert_eq!(info.display_name, "ch-test");
    assert_eq!(info.negotiated_revision(), Revision::CLIENT);
    client.close().await;
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    // Reserve a port, then free it so nothing listens there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = Config::new()
        .with_host("127.0.0.1")
        .with_port(port)
        .with_timeouts(TimeoutConfig::new().connect(Duration::from_secs(1)))
        .with_retry(
            RetryPolicy::new()
                .max_retries(2)
                .retry_timeout(Duration::from_millis(20)),
        );

    let started = Instant::now();
    let err = Client::connect(config).await.unwrap_err();
    assert!(err.is_transient());
    // Two pauses between three attempts.
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_handshake_refusal_is_not_retried() {
    let server = MockClickHouseServer::builder()
        .with_hello_exception(ExceptionPacket {
            code: 192,
            name: "UNKNOWN_USER".into(),
            message: "nobody: there is no such user".into(),
            ..ExceptionPacket::default()
        })
        .build()
        .await
        .unwrap();

    let config = config_for(&server).with_retry(
        RetryPolicy::new()
            .max_retries(5)
            .retry_timeout(Duration::from_secs(30)),
    );
    let started = Instant::now();
    let err = Client::connect(config).await.unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.remote_code(), Some(192));
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let server = MockClickHouseServer::builder().build().await.unwrap();

    let mut connection = Connection::open(config_for(&server)).await.unwrap();
    connection.close().await;
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert!(connection.server_info().is_none());

    connection.connect().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert!(connection.ping().await);
    connection.close().await;
}

#[tokio::test]
async fn test_connect_twice_is_invalid() {
    let server = MockClickHouseServer::builder().build().await.unwrap();

    let mut connection = Connection::open(config_for(&server)).await.unwrap();
    let err = connection.connect().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: ConnectionState::Ready,
            operation: "connect"
        }
    ));
    connection.close().await;
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_rows_response() {
    let server = MockClickHouseServer::builder()
        .with_response(
            "SELECT id, name FROM users",
            MockResponse::rows(
                vec![MockColumn::uint64("id"), MockColumn::string("name")],
                vec![
                    vec![Value::UInt64(1), Value::from("Alice")],
                    vec![Value::UInt64(2), Value::from("Bob")],
                ],
            ),
        )
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    let rows = client.execute("SELECT id, name FROM users").await.unwrap();
    assert_eq!(rows.len(), 2);
    let names: Vec<String> = rows.iter().map(|r| r.get_as("name").unwrap()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
    assert_eq!(rows[1].get_as::<u64>("id").unwrap(), 2);

    let err = rows[0].get_as::<u64>("missing").unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(ref name) if name == "missing"));
    client.close().await;
}

#[tokio::test]
async fn test_full_result_counters() {
    let server = MockClickHouseServer::builder()
        .with_default_response(MockResponse::scalar(MockColumn::uint8("x"), 1u8))
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    let result = client.query("SELECT 1 AS x").await.unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.progress.rows, 1);
    assert_eq!(result.profile.rows_read, 1);
    assert!(result.totals.is_none());
    assert!(result.extremes.is_none());
    client.close().await;
}

#[tokio::test]
async fn test_date_and_datetime_columns() {
    let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let moment = Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 10).unwrap();
    let server = MockClickHouseServer::builder()
        .with_default_response(MockResponse::rows(
            vec![
                MockColumn::new("d", "Date"),
                MockColumn::new("ts", "DateTime"),
                MockColumn::new("tags", "Array(String)"),
            ],
            vec![vec![
                Value::Date(day),
                Value::DateTime(moment),
                Value::Array(vec![Value::from("a"), Value::from("b")]),
            ]],
        ))
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    let rows = client.execute("SELECT d, ts, tags FROM t").await.unwrap();
    assert_eq!(rows[0].get_as::<NaiveDate>("d").unwrap(), day);
    assert_eq!(rows[0].get_as::<chrono::DateTime<Utc>>("ts").unwrap(), moment);
    assert_eq!(rows[0].get_as::<Vec<String>>("tags").unwrap(), ["a", "b"]);
    client.close().await;
}

#[tokio::test]
async fn test_many_queries_one_connection() {
    let server = MockClickHouseServer::builder()
        .with_default_response(MockResponse::custom(|query| {
            MockResponse::scalar(MockColumn::string("q"), query.to_string())
        }))
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    for i in 0..5 {
        let text = format!("SELECT {i}");
        let rows = client.execute(&text).await.unwrap();
        assert_eq!(rows[0].get_as::<String>("q").unwrap(), text);
    }
    assert!(client.ping().await);
    client.close().await;

    assert_eq!(server.received_queries().await.len(), 5);
}

#[tokio::test]
async fn test_error_then_success() {
    let server = MockClickHouseServer::builder()
        .with_response(
            "SELECT * FROM missing",
            MockResponse::error(60, "UNKNOWN_TABLE", "Table default.missing does not exist"),
        )
        .with_response("SELECT 1", MockResponse::scalar(MockColumn::uint8("1"), 1u8))
        .build()
        .await
        .unwrap();

    let mut client = Client::connect(config_for(&server)).await.unwrap();
    let err = client.execute("SELECT * FROM missing").await.unwrap_err();
    assert_eq!(err.remote_code(), Some(60));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("UNKNOWN_TABLE"));

    let rows = client.execute("SELECT 1").await.unwrap();
    assert_eq!(rows[0].get_as::<u8>("1").unwrap(), 1);
    client.close().await;
}

#[tokio::test]
async fn test_query_before_connect() {
    let server = MockClickHouseServer::builder().build().await.unwrap();
    let mut connection = Connection::new(config_for(&server));

    let err = connection.query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert!(!connection.ping().await);
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_compression_flag_is_sent() {
    let server = MockClickHouseServer::builder().build().await.unwrap();

    let mut client = Client::connect(config_for(&server).with_compression(true))
        .await
        .unwrap();
    client.execute("SELECT 1").await.unwrap();
    client.close().await;

    let queries = server.received_queries().await;
    assert_eq!(
        queries[0].compression,
        native_protocol::CompressionState::Enabled
    );
}
