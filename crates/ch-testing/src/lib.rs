//! # ch-testing
//!
//! Test infrastructure for ClickHouse native client development.
//!
//! This crate provides utilities for testing against ClickHouse without
//! a real server, and for integration testing against one when available.
//!
//! ## Features
//!
//! - Mock server speaking the native protocol (no Docker required)
//! - Scripted single-connection server for exact byte sequences,
//!   fragmented delivery and early close
//! - Server packet builder shared by both
//! - ClickHouse container management via testcontainers
//! - Test fixture utilities and live-server settings from the environment
//!
//! ## Mock Server Example
//!
//! ```rust,ignore
//! use ch_testing::{MockClickHouseServer, MockColumn, MockResponse};
//! use ch_types::Value;
//!
//! #[tokio::test]
//! async fn test_with_mock_server() {
//!     let server = MockClickHouseServer::builder()
//!         .with_response(
//!             "SELECT id, name FROM users",
//!             MockResponse::rows(
//!                 vec![MockColumn::uint64("id"), MockColumn::string("name")],
//!                 vec![vec![Value::UInt64(1), Value::from("Alice")]],
//!             ),
//!         )
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // ...
//! }
//! ```
//!
//! ## Container Example
//!
//! ```rust,ignore
//! use ch_testing::ClickHouseContainer;
//! use testcontainers::runners::AsyncRunner;
//!
//! #[tokio::test]
//! async fn test_with_real_server() {
//!     let container = ClickHouseContainer::default().start().await.unwrap();
//!     let port = container.get_host_port_ipv4(9000).await.unwrap();
//!     // Connect to localhost:port...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;
pub mod mock_server;
pub mod packets;
pub mod script;

pub use container::ClickHouseContainer;
pub use fixtures::{LiveServer, TestFixture};
pub use mock_server::{
    MockClickHouseServer, MockResponse, MockServerBuilder, MockServerConfig, MockServerError,
};
pub use packets::{MockColumn, ServerPackets};
pub use script::{Script, ScriptStep, ScriptedServer};
