//! # ch-types
//!
//! ClickHouse column types, values and their native-format codecs.
//!
//! A column type arrives as a descriptor string in every block header.
//! [`DataType::parse`] turns it into a codec tree that reads values from an
//! [`InputStream`](ch_codec::InputStream) and writes them to an
//! [`OutputStream`](ch_codec::OutputStream). Values are decoded row by row,
//! one [`Value`] per cell.
//!
//! ## Type Mappings
//!
//! | ClickHouse Type | Wire format | Rust Type |
//! |-----------------|-------------|-----------|
//! | `UInt8`..`UInt64` | varint | `u8`..`u64` |
//! | `Int8`..`Int64` | varint, two's complement of the width | `i8`..`i64` |
//! | `Float32` / `Float64` | 4 / 8 bytes little-endian | `f32` / `f64` |
//! | `String` | varint length + UTF-8 bytes | `String` |
//! | `Date` | varint days since 1970-01-01 | `chrono::NaiveDate` |
//! | `DateTime` | varint seconds since epoch | `chrono::DateTime<Utc>` |
//! | `Array(T)` | varint count + elements | `Vec<T>` |
//! | `Nullable(T)` | varint flag, then value when the flag is 0 | `Option<T>` |
//! | `LowCardinality(T)` | dictionary size, dictionary values, varint index | `T` |
//! | `Tuple(T1, ...)` | each element in order | [`Value::Tuple`] |
//! | `Map(K, V)` | varint count + key/value pairs | [`Value::Map`] |
//!
//! ## Example
//!
//! ```rust,ignore
//! use ch_types::{DataType, FromValue, Value};
//!
//! let ty = DataType::parse("Array(Nullable(UInt8))")?;
//! let value = ty.read_value(&mut input).await?;
//! let items: Vec<Option<u8>> = FromValue::from_value(&value)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod data_type;
pub mod decode;
pub mod encode;
pub mod error;
pub mod from_value;
pub mod value;

pub use data_type::{DataType, MAX_NESTING_DEPTH, split_arguments, split_map_arguments};
pub use decode::wrap_signed;
pub use encode::unwrap_signed;
pub use error::TypeError;
pub use from_value::FromValue;
pub use value::Value;
