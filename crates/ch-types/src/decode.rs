//! Reading values from the input stream.
//!
//! Integers of every width travel as varints. Signed widths carry the
//! two's-complement bit pattern of the value truncated to the width, so a
//! raw magnitude at or above half the width's range is shifted down by the
//! full range.

use ch_codec::InputStream;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::data_type::DataType;
use crate::error::TypeError;
use crate::value::Value;

/// Day number of 1970-01-01 counted from 0001-01-01 as day 1.
pub const UNIX_EPOCH_DAY_FROM_CE: i64 = 719_163;

/// Largest element count reserved up front for an array or map.
const MAX_PREALLOCATE: usize = 1024;

/// Reinterpret a varint magnitude as a signed integer of `bits` width.
///
/// Returns `None` when `raw` does not fit in `bits` bits at all.
#[must_use]
pub fn wrap_signed(raw: u64, bits: u32) -> Option<i64> {
    if bits >= 64 {
        return Some(raw as i64);
    }
    let modulus = 1u64 << bits;
    if raw >= modulus {
        return None;
    }
    if raw >= modulus >> 1 {
        Some(raw as i64 - modulus as i64)
    } else {
        Some(raw as i64)
    }
}

fn out_of_range(target_type: &'static str, value: impl ToString) -> TypeError {
    TypeError::OutOfRange {
        target_type,
        value: value.to_string(),
    }
}

fn unsigned<T: TryFrom<u64>>(raw: u64, target_type: &'static str) -> Result<T, TypeError> {
    T::try_from(raw).map_err(|_| out_of_range(target_type, raw))
}

fn signed(raw: u64, bits: u32, target_type: &'static str) -> Result<i64, TypeError> {
    wrap_signed(raw, bits).ok_or_else(|| out_of_range(target_type, raw))
}

fn date_from_days(days: u64) -> Result<NaiveDate, TypeError> {
    i64::try_from(days)
        .ok()
        .and_then(|d| d.checked_add(UNIX_EPOCH_DAY_FROM_CE))
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("{days} days since epoch")))
}

fn datetime_from_secs(secs: u64) -> Result<DateTime<Utc>, TypeError> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .ok_or_else(|| TypeError::InvalidDateTime(format!("{secs} seconds since epoch")))
}

impl DataType {
    /// Read one value of this type.
    pub fn read_value<'a, S>(
        &'a self,
        input: &'a mut InputStream<S>,
    ) -> BoxFuture<'a, Result<Value, TypeError>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'a,
    {
        Box::pin(async move {
            let value = match self {
                Self::String => Value::String(input.read_string().await?),
                Self::UInt8 => Value::UInt8(unsigned(input.read_varint().await?, "UInt8")?),
                Self::UInt16 => Value::UInt16(unsigned(input.read_varint().await?, "UInt16")?),
                Self::UInt32 => Value::UInt32(unsigned(input.read_varint().await?, "UInt32")?),
                Self::UInt64 => Value::UInt64(input.read_varint().await?),
                Self::Int8 => Value::Int8(signed(input.read_varint().await?, 8, "Int8")? as i8),
                Self::Int16 => {
                    Value::Int16(signed(input.read_varint().await?, 16, "Int16")? as i16)
                }
                Self::Int32 => {
                    Value::Int32(signed(input.read_varint().await?, 32, "Int32")? as i32)
                }
                Self::Int64 => Value::Int64(signed(input.read_varint().await?, 64, "Int64")?),
                Self::Float32 => Value::Float32(input.read_f32().await?),
                Self::Float64 => Value::Float64(input.read_f64().await?),
                Self::Date => Value::Date(date_from_days(input.read_varint().await?)?),
                Self::DateTime => Value::DateTime(datetime_from_secs(input.read_varint().await?)?),
                Self::Array(element) => {
                    let count = input.read_varint().await?;
                    let mut items = Vec::with_capacity(preallocate(count));
                    for _ in 0..count {
                        items.push(element.read_value(input).await?);
                    }
                    Value::Array(items)
                }
                Self::Tuple(elements) => {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        items.push(element.read_value(input).await?);
                    }
                    Value::Tuple(items)
                }
                Self::Map(key, value) => {
                    let count = input.read_varint().await?;
                    let mut entries = Vec::with_capacity(preallocate(count));
                    for _ in 0..count {
                        let k = key.read_value(input).await?;
                        let v = value.read_value(input).await?;
                        entries.push((k, v));
                    }
                    Value::Map(entries)
                }
                Self::Nullable(inner) => {
                    if input.read_varint().await? != 0 {
                        Value::Null
                    } else {
                        inner.read_value(input).await?
                    }
                }
                Self::LowCardinality(inner) => {
                    let size = input.read_varint().await?;
                    let mut dictionary = Vec::with_capacity(preallocate(size));
                    for _ in 0..size {
                        dictionary.push(inner.read_value(input).await?);
                    }
                    let index = input.read_varint().await?;
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| dictionary.get(i).cloned())
                        .ok_or_else(|| out_of_range("LowCardinality index", index))?
                }
            };
            Ok(value)
        })
    }
}

fn preallocate(count: u64) -> usize {
    usize::try_from(count).map_or(MAX_PREALLOCATE, |c| c.min(MAX_PREALLOCATE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ch_codec::{Transport, TransportTimeouts};
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    async fn decode(type_name: &str, bytes: &[u8]) -> Result<Value, TypeError> {
        let (client, mut server): (DuplexStream, DuplexStream) = duplex(4096);
        server.write_all(bytes).await.unwrap();
        drop(server);
        let mut input = InputStream::new(Transport::from_stream(client, TransportTimeouts::default()));
        DataType::parse(type_name)?.read_value(&mut input).await
    }

    #[test]
    fn test_wrap_signed() {
        assert_eq!(wrap_signed(255, 8), Some(-1));
        assert_eq!(wrap_signed(128, 8), Some(-128));
        assert_eq!(wrap_signed(127, 8), Some(127));
        assert_eq!(wrap_signed(256, 8), None);
        assert_eq!(wrap_signed(u64::MAX, 64), Some(-1));
        assert_eq!(wrap_signed(1 << 63, 64), Some(i64::MIN));
        assert_eq!(wrap_signed(0xffff_ffff, 32), Some(-1));
    }

    #[tokio::test]
    async fn test_scalars() {
        assert_eq!(decode("UInt8", &[1]).await.unwrap(), Value::UInt8(1));
        assert_eq!(decode("Int8", &[0xff, 0x01]).await.unwrap(), Value::Int8(-1));
        assert_eq!(decode("UInt64", &[0xac, 0x02]).await.unwrap(), Value::UInt64(300));
        assert_eq!(
            decode("String", &[2, b'h', b'i']).await.unwrap(),
            Value::String("hi".into())
        );
        assert_eq!(
            decode("Float32", &1.5f32.to_le_bytes()).await.unwrap(),
            Value::Float32(1.5)
        );
    }

    #[tokio::test]
    async fn test_unsigned_out_of_range() {
        assert!(matches!(
            decode("UInt8", &[0x80, 0x02]).await,
            Err(TypeError::OutOfRange { target_type: "UInt8", .. })
        ));
    }

    #[tokio::test]
    async fn test_signed_magnitude_past_modulus() {
        // 256 does not fit the 8-bit modulus; 255 wraps to -1.
        assert!(matches!(
            decode("Int8", &[0x80, 0x02]).await,
            Err(TypeError::OutOfRange { target_type: "Int8", value }) if value == "256"
        ));
        assert!(matches!(
            decode("Int16", &[0x80, 0x80, 0x04]).await,
            Err(TypeError::OutOfRange { target_type: "Int16", .. })
        ));
    }

    #[tokio::test]
    async fn test_date_and_datetime() {
        // 19_000 days after 1970-01-01.
        let value = decode("Date", &[0xb8, 0x94, 0x01]).await.unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(2022, 1, 8).unwrap()));

        let value = decode("Date", &[0]).await.unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()));

        let value = decode("DateTime", &[0x80, 0xa3, 0x05]).await.unwrap();
        assert_eq!(value, Value::DateTime(DateTime::from_timestamp(86_400, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_composites() {
        assert_eq!(
            decode("Array(UInt8)", &[3, 1, 2, 3]).await.unwrap(),
            Value::Array(vec![Value::UInt8(1), Value::UInt8(2), Value::UInt8(3)])
        );
        assert_eq!(
            decode("Nullable(String)", &[1]).await.unwrap(),
            Value::Null
        );
        assert_eq!(
            decode("Nullable(String)", &[0, 1, b'x']).await.unwrap(),
            Value::String("x".into())
        );
        assert_eq!(
            decode("Map(String, UInt8)", &[1, 1, b'k', 9]).await.unwrap(),
            Value::Map(vec![(Value::String("k".into()), Value::UInt8(9))])
        );
        assert_eq!(
            decode("Tuple(UInt8, Int8)", &[7, 0xfe, 0x01]).await.unwrap(),
            Value::Tuple(vec![Value::UInt8(7), Value::Int8(-2)])
        );
        assert_eq!(
            decode("LowCardinality(String)", &[1, 2, b'o', b'k', 0]).await.unwrap(),
            Value::String("ok".into())
        );
    }

    #[tokio::test]
    async fn test_low_cardinality_bad_index() {
        assert!(matches!(
            decode("LowCardinality(UInt8)", &[1, 5, 1]).await,
            Err(TypeError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_value_is_codec_error() {
        let err = decode("Array(UInt8)", &[3, 1]).await.unwrap_err();
        assert!(err.is_codec());
    }
}
