//! Trait for converting column values to Rust types.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::TypeError;
use crate::value::Value;

/// Trait for types that can be extracted from a column value.
///
/// Implemented for the Rust counterparts of every supported column type.
/// Integer targets accept any integer value that fits, so a `UInt8` column
/// can be read as `i64`.
pub trait FromValue: Sized {
    /// Convert from a column value to this type.
    fn from_value(value: &Value) -> Result<Self, TypeError>;

    /// Convert from a possibly-NULL column value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_value_nullable(value: &Value) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_value(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &Value) -> TypeError {
    match value {
        Value::Null => TypeError::UnexpectedNull,
        _ => TypeError::TypeMismatch {
            expected,
            actual: value.type_name().to_string(),
        },
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, TypeError> {
                    let v = value
                        .as_i128()
                        .ok_or_else(|| mismatch(stringify!($ty), value))?;
                    <$ty>::try_from(v).map_err(|_| TypeError::OutOfRange {
                        target_type: stringify!($ty),
                        value: v.to_string(),
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Float32(v) => Ok(*v),
            _ => Err(mismatch("f32", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Date(v) => Ok(*v),
            Value::DateTime(v) => Ok(v.date_naive()),
            _ => Err(mismatch("NaiveDate", value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        value.as_datetime().ok_or_else(|| mismatch("DateTime<Utc>", value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        T::from_value_nullable(value)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            _ => Err(mismatch("Vec", value)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert_eq!(i64::from_value(&Value::UInt8(7)).unwrap(), 7);
        assert_eq!(u8::from_value(&Value::Int64(255)).unwrap(), 255);
        assert!(matches!(
            u8::from_value(&Value::Int64(256)),
            Err(TypeError::OutOfRange { target_type: "u8", .. })
        ));
        assert!(matches!(
            u32::from_value(&Value::Int8(-1)),
            Err(TypeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_null_handling() {
        assert!(matches!(
            i32::from_value(&Value::Null),
            Err(TypeError::UnexpectedNull)
        ));
        assert_eq!(Option::<i32>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(&Value::Int32(4)).unwrap(), Some(4));
    }

    #[test]
    fn test_mismatch() {
        assert!(matches!(
            String::from_value(&Value::UInt8(1)),
            Err(TypeError::TypeMismatch {
                expected: "String",
                ..
            })
        ));
        assert!(f32::from_value(&Value::Float64(1.0)).is_err());
        assert_eq!(f64::from_value(&Value::Float32(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_arrays() {
        let value = Value::Array(vec![Value::UInt8(1), Value::Null]);
        assert_eq!(
            Vec::<Option<u16>>::from_value(&value).unwrap(),
            vec![Some(1), None]
        );
        assert!(Vec::<u16>::from_value(&value).is_err());
    }

    #[test]
    fn test_dates() {
        let ts = DateTime::from_timestamp(86_400 + 60, 0).unwrap();
        assert_eq!(
            NaiveDate::from_value(&Value::DateTime(ts)).unwrap(),
            NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()
        );
        assert_eq!(DateTime::<Utc>::from_value(&Value::DateTime(ts)).unwrap(), ts);
    }
}
