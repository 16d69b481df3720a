//! Integration tests against a live ClickHouse server.
//!
//! These tests are ignored by default. To run them:
//!
//! ```bash
//! docker run -d -p 9000:9000 --ulimit nofile=262144:262144 clickhouse/clickhouse-server:24.3
//!
//! export CLICKHOUSE_HOST=localhost
//! export CLICKHOUSE_PORT=9000
//! export CLICKHOUSE_USER=default
//! export CLICKHOUSE_PASSWORD=
//!
//! cargo test -p ch-client --test integration -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ch_client::{Client, Config, ConnectionState, Value};
use ch_testing::{LiveServer, MockColumn, TestFixture};

fn live_config() -> Option<Config> {
    let server = LiveServer::from_env()?;
    Some(
        Config::new()
            .with_host(server.host)
            .with_port(server.port)
            .with_user(server.user)
            .with_password(server.password)
            .with_database(server.database),
    )
}

async fn connect() -> Option<Client> {
    let config = live_config()?;
    Some(Client::connect(config).await.expect("connect to live server"))
}

#[tokio::test]
#[ignore = "Requires ClickHouse"]
async fn test_live_handshake_and_ping() {
    let Some(mut client) = connect().await else {
        return;
    };
    let info = client.server_info().unwrap();
    assert!(!info.name.is_empty());
    assert!(info.revision.raw() > 0);
    assert!(client.ping().await);
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
#[ignore = "Requires ClickHouse"]
async fn test_live_select_numbers() {
    let Some(mut client) = connect().await else {
        return;
    };
    let rows = client
        .execute("SELECT number FROM system.numbers LIMIT 5")
        .await
        .unwrap();
    let numbers: Vec<u64> = rows.iter().map(|r| r.get_as("number").unwrap()).collect();
    assert_eq!(numbers, [0, 1, 2, 3, 4]);
    client.close().await;
}

#[tokio::test]
#[ignore = "Requires ClickHouse"]
async fn test_live_syntax_error() {
    let Some(mut client) = connect().await else {
        return;
    };
    let err = client.execute("SELEC 1").await.unwrap_err();
    assert_eq!(err.remote_code(), Some(62));
    assert!(client.ping().await);
    client.close().await;
}

#[tokio::test]
#[ignore = "Requires ClickHouse"]
async fn test_live_nullable_and_strings() {
    let Some(mut client) = connect().await else {
        return;
    };
    let rows = client
        .execute("SELECT 'abc' AS s, CAST(NULL AS Nullable(Int32)) AS n, toInt8(-5) AS i")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("s"), Some(&Value::from("abc")));
    assert!(rows[0].is_null("n"));
    assert_eq!(rows[0].get_as::<i8>("i").unwrap(), -5);
    client.close().await;
}

#[tokio::test]
#[ignore = "Requires ClickHouse"]
async fn test_live_fixture_round_trip() {
    let Some(mut client) = connect().await else {
        return;
    };
    let fixture = TestFixture::new("ch_client_it").with_table(
        "events",
        vec![MockColumn::uint64("id"), MockColumn::string("name")],
    );

    client.execute(&fixture.create_database_sql()).await.unwrap();
    for sql in fixture.create_tables_sql() {
        client.execute(&sql).await.unwrap();
    }
    client
        .execute("INSERT INTO ch_client_it.events SELECT number + 1, toString(number) FROM numbers(3)")
        .await
        .unwrap();

    let result = client
        .query("SELECT name, count() AS c FROM ch_client_it.events GROUP BY name WITH TOTALS ORDER BY name")
        .await
        .unwrap();
    assert_eq!(result.row_count(), 3);
    let totals = result.totals.as_ref().expect("totals block");
    assert_eq!(totals.row_count(), 1);
    assert_eq!(totals.rows()[0].get_as::<u64>("c").unwrap(), 3);

    let rows = client
        .execute("SELECT id, name FROM ch_client_it.events ORDER BY id")
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].get_as::<String>("name").unwrap(), "1");

    client.execute(&fixture.drop_database_sql()).await.unwrap();
    client.close().await;
}
