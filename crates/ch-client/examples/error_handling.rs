//! Error handling example.
//!
//! Shows how to tell server exceptions apart from transport failures and
//! how a connection behaves after each.
//!
//! # Running
//!
//! ```bash
//! export CLICKHOUSE_URL=clickhouse://default@localhost:9000/default
//!
//! cargo run --example error_handling
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use ch_client::{Client, Config, ConnectionState, Error, RetryPolicy};
use tracing_subscriber::EnvFilter;

fn describe(err: &Error) {
    match err {
        Error::Remote(remote) => {
            println!("  server exception {} ({})", remote.code, remote.name);
            for (depth, cause) in remote.chain().enumerate().skip(1) {
                println!("  {:indent$}caused by: {cause}", "", indent = depth * 2);
            }
        }
        e if e.is_transient() => println!("  transient failure, safe to reconnect: {e}"),
        e if e.is_protocol_error() => println!("  protocol violation: {e}"),
        e => println!("  other error: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Unreachable server: retried, then reported as transient.
    println!("Connecting to a closed port...");
    let unreachable = Config::from_connection_string("clickhouse://127.0.0.1:1")?.with_retry(
        RetryPolicy::new()
            .max_retries(2)
            .retry_timeout(Duration::from_millis(200)),
    );
    if let Err(e) = Client::connect(unreachable).await {
        describe(&e);
    }

    let url = std::env::var("CLICKHOUSE_URL")
        .unwrap_or_else(|_| "clickhouse://default@localhost:9000/default".into());
    let mut client = Client::connect_str(&url).await?;

    // 2. Server exception: the connection stays usable.
    println!("Running a malformed query...");
    if let Err(e) = client.execute("SELEC 1").await {
        describe(&e);
    }
    assert_eq!(client.state(), ConnectionState::Ready);

    // 3. Nested exception chain.
    println!("Running a query that throws...");
    if let Err(e) = client.execute("SELECT throwIf(number = 3) FROM numbers(10)").await {
        describe(&e);
    }

    // 4. Type conversion errors name the column.
    let rows = client.execute("SELECT -1 AS negative").await?;
    if let Err(e) = rows[0].get_as::<u64>("negative") {
        println!("Conversion failed:");
        describe(&e);
    }
    if let Err(e) = rows[0].get_as::<i64>("missing") {
        println!("Lookup failed:");
        describe(&e);
    }

    println!("ping after errors: {}", client.ping().await);
    client.close().await;
    Ok(())
}
