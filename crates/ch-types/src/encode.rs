//! Writing values to the output stream.

use ch_codec::OutputStream;
use chrono::Datelike;

use crate::data_type::DataType;
use crate::decode::UNIX_EPOCH_DAY_FROM_CE;
use crate::error::TypeError;
use crate::value::Value;

fn mismatch(expected: &'static str, value: &Value) -> TypeError {
    if value.is_null() {
        TypeError::UnexpectedNull
    } else {
        TypeError::TypeMismatch {
            expected,
            actual: value.type_name().to_string(),
        }
    }
}

/// Integer payload of `value` checked against `min..=max`.
fn integer_in_range(
    value: &Value,
    target_type: &'static str,
    min: i128,
    max: i128,
) -> Result<i128, TypeError> {
    let v = value.as_i128().ok_or_else(|| mismatch(target_type, value))?;
    if v < min || v > max {
        return Err(TypeError::OutOfRange {
            target_type,
            value: v.to_string(),
        });
    }
    Ok(v)
}

/// Two's-complement bit pattern of `value` truncated to `bits`.
#[must_use]
pub fn unwrap_signed(value: i64, bits: u32) -> u64 {
    if bits >= 64 {
        value as u64
    } else {
        (value as u64) & ((1u64 << bits) - 1)
    }
}

impl DataType {
    /// Write one value of this type.
    ///
    /// Integer values of any width are accepted when they fit the column
    /// type. On error, `out` may hold a partially written value.
    pub fn write_value(&self, out: &mut OutputStream, value: &Value) -> Result<(), TypeError> {
        match self {
            Self::UInt8 => write_unsigned(out, value, "UInt8", u64::from(u8::MAX)),
            Self::UInt16 => write_unsigned(out, value, "UInt16", u64::from(u16::MAX)),
            Self::UInt32 => write_unsigned(out, value, "UInt32", u64::from(u32::MAX)),
            Self::UInt64 => write_unsigned(out, value, "UInt64", u64::MAX),
            Self::Int8 => write_signed(out, value, "Int8", 8),
            Self::Int16 => write_signed(out, value, "Int16", 16),
            Self::Int32 => write_signed(out, value, "Int32", 32),
            Self::Int64 => write_signed(out, value, "Int64", 64),
            Self::Float32 => {
                let v = match value {
                    Value::Float32(v) => *v,
                    Value::Float64(v) => *v as f32,
                    other => return Err(mismatch("Float32", other)),
                };
                out.write_f32(v);
                Ok(())
            }
            Self::Float64 => {
                let v = value.as_f64().ok_or_else(|| mismatch("Float64", value))?;
                out.write_f64(v);
                Ok(())
            }
            Self::String => {
                let s = value.as_str().ok_or_else(|| mismatch("String", value))?;
                out.write_string(s);
                Ok(())
            }
            Self::Date => {
                let date = value.as_date().ok_or_else(|| mismatch("Date", value))?;
                let days = i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAY_FROM_CE;
                let days = u64::try_from(days).map_err(|_| TypeError::OutOfRange {
                    target_type: "Date",
                    value: date.to_string(),
                })?;
                out.write_varint(days);
                Ok(())
            }
            Self::DateTime => {
                let ts = value.as_datetime().ok_or_else(|| mismatch("DateTime", value))?;
                let secs = u64::try_from(ts.timestamp()).map_err(|_| TypeError::OutOfRange {
                    target_type: "DateTime",
                    value: ts.to_rfc3339(),
                })?;
                out.write_varint(secs);
                Ok(())
            }
            Self::Array(element) => {
                let Value::Array(items) = value else {
                    return Err(mismatch("Array", value));
                };
                out.write_varint(items.len() as u64);
                items.iter().try_for_each(|item| element.write_value(out, item))
            }
            Self::Tuple(elements) => {
                let Value::Tuple(items) = value else {
                    return Err(mismatch("Tuple", value));
                };
                if items.len() != elements.len() {
                    return Err(TypeError::TupleArity {
                        expected: elements.len(),
                        actual: items.len(),
                    });
                }
                elements
                    .iter()
                    .zip(items)
                    .try_for_each(|(element, item)| element.write_value(out, item))
            }
            Self::Map(key, val) => {
                let Value::Map(entries) = value else {
                    return Err(mismatch("Map", value));
                };
                out.write_varint(entries.len() as u64);
                for (k, v) in entries {
                    key.write_value(out, k)?;
                    val.write_value(out, v)?;
                }
                Ok(())
            }
            Self::Nullable(inner) => {
                if value.is_null() {
                    out.write_varint(1);
                    Ok(())
                } else {
                    out.write_varint(0);
                    inner.write_value(out, value)
                }
            }
            Self::LowCardinality(inner) => {
                // Single-entry dictionary followed by index 0.
                out.write_varint(1);
                inner.write_value(out, value)?;
                out.write_varint(0);
                Ok(())
            }
        }
    }
}

fn write_unsigned(
    out: &mut OutputStream,
    value: &Value,
    target_type: &'static str,
    max: u64,
) -> Result<(), TypeError> {
    let v = integer_in_range(value, target_type, 0, i128::from(max))?;
    out.write_varint(v as u64);
    Ok(())
}

fn write_signed(
    out: &mut OutputStream,
    value: &Value,
    target_type: &'static str,
    bits: u32,
) -> Result<(), TypeError> {
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    let v = integer_in_range(value, target_type, min, max)?;
    out.write_varint(unwrap_signed(v as i64, bits));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    fn encode(type_name: &str, value: impl Into<Value>) -> Result<Vec<u8>, TypeError> {
        let mut out = OutputStream::new();
        DataType::parse(type_name)?.write_value(&mut out, &value.into())?;
        Ok(out.pending().to_vec())
    }

    #[test]
    fn test_signed_wraparound_bytes() {
        assert_eq!(encode("Int8", -1i8).unwrap(), vec![0xff, 0x01]);
        assert_eq!(encode("Int8", i8::MIN).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode("Int16", -1i16).unwrap(), vec![0xff, 0xff, 0x03]);
        assert_eq!(encode("Int64", -1i64).unwrap().len(), 10);
    }

    #[test]
    fn test_integer_range_checks() {
        assert_eq!(encode("UInt8", 200u32).unwrap(), vec![0xc8, 0x01]);
        assert!(matches!(
            encode("UInt8", 256u32),
            Err(TypeError::OutOfRange { target_type: "UInt8", .. })
        ));
        assert!(matches!(
            encode("UInt32", -1i32),
            Err(TypeError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode("Int8", 128i32),
            Err(TypeError::OutOfRange { target_type: "Int8", .. })
        ));
        assert!(matches!(
            encode("Int8", "x"),
            Err(TypeError::TypeMismatch { expected: "Int8", .. })
        ));
    }

    #[test]
    fn test_null_handling() {
        assert_eq!(encode("Nullable(UInt8)", Value::Null).unwrap(), vec![1]);
        assert_eq!(encode("Nullable(UInt8)", 5u8).unwrap(), vec![0, 5]);
        assert!(matches!(
            encode("UInt8", Value::Null),
            Err(TypeError::UnexpectedNull)
        ));
    }

    #[test]
    fn test_tuple_arity() {
        let value = Value::Tuple(vec![Value::UInt8(1)]);
        assert!(matches!(
            encode("Tuple(UInt8, String)", value),
            Err(TypeError::TupleArity {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_low_cardinality_single_entry() {
        assert_eq!(
            encode("LowCardinality(String)", "ab").unwrap(),
            vec![1, 2, b'a', b'b', 0]
        );
    }

    #[test]
    fn test_dates() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(encode("Date", epoch).unwrap(), vec![0]);

        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert!(matches!(
            encode("Date", before),
            Err(TypeError::OutOfRange { target_type: "Date", .. })
        ));

        let ts: DateTime<Utc> = DateTime::from_timestamp(300, 0).unwrap();
        assert_eq!(encode("DateTime", ts).unwrap(), vec![0xac, 0x02]);
    }

    #[test]
    fn test_map_and_array() {
        let map = Value::Map(vec![
            (Value::from("a"), Value::from(vec![1u8, 2])),
            (Value::from("b"), Value::Array(vec![])),
        ]);
        assert_eq!(
            encode("Map(String, Array(UInt8))", map).unwrap(),
            vec![2, 1, b'a', 2, 1, 2, 1, b'b', 0]
        );
    }
}
