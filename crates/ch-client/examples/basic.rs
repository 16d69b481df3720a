//! Basic connection and query example.
//!
//! Connects over the native protocol, prints the server metadata and runs
//! a couple of queries.
//!
//! # Running
//!
//! ```bash
//! export CLICKHOUSE_URL=clickhouse://default@localhost:9000/default
//!
//! RUST_LOG=ch_client=debug cargo run --example basic
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use ch_client::{Client, Config, Error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("CLICKHOUSE_URL")
        .unwrap_or_else(|_| "clickhouse://default@localhost:9000/default".into());
    let config = Config::from_connection_string(&url)?;

    // Display redacts the password.
    println!("Connecting to {config}...");
    let mut client = Client::connect(config).await?;

    if let Some(info) = client.server_info() {
        println!("Connected to {info}");
        println!("  timezone:     {}", info.timezone);
        println!("  display name: {}", info.display_name);
    }

    // Rows only
    let rows = client
        .execute("SELECT number, toString(number * 2) AS doubled FROM system.numbers LIMIT 5")
        .await?;
    for row in &rows {
        let number: u64 = row.get_as("number")?;
        let doubled: String = row.get_as("doubled")?;
        println!("{number} -> {doubled}");
    }

    // Full result with counters
    let result = client
        .query_with_settings(
            "SELECT count() AS c FROM system.numbers LIMIT 1000000",
            &[("max_block_size", "65536")],
        )
        .await?;
    for row in result.rows() {
        println!("count: {}", row.get_as::<u64>("c")?);
    }
    println!(
        "progress: {} rows, {} bytes; server read {} rows in {:.3}s",
        result.progress.rows,
        result.progress.bytes,
        result.profile.rows_read,
        result.profile.elapsed_seconds
    );

    println!("ping: {}", client.ping().await);
    client.close().await;
    Ok(())
}
