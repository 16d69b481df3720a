//! Type descriptors and the codec tree they parse into.
//!
//! A column type arrives on the wire as a descriptor string such as
//! `Array(Nullable(Map(String, Tuple(UInt8, Float32))))`. [`DataType::parse`]
//! turns it into a tree: scalar leaves and composite nodes that own their
//! children. The tree is stateless; reading and writing values is done by
//! [`DataType::read_value`](crate::decode) and
//! [`DataType::write_value`](crate::encode).
//!
//! Parsing is table driven. Scalar names map straight to a variant; a
//! composite name (`Array`, `Nullable`, `LowCardinality`, `Tuple`, `Map`)
//! maps to a constructor that receives the text between the outer
//! parentheses.

use std::fmt;

use crate::error::TypeError;

/// A parsed column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Length-prefixed UTF-8 string.
    String,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE-754 single precision.
    Float32,
    /// IEEE-754 double precision.
    Float64,
    /// Calendar day.
    Date,
    /// Unix timestamp in seconds.
    DateTime,
    /// Variable-length array of one element type.
    Array(Box<DataType>),
    /// Value or NULL.
    Nullable(Box<DataType>),
    /// Dictionary-encoded value (single-entry dictionary form).
    LowCardinality(Box<DataType>),
    /// Fixed-arity heterogeneous tuple.
    Tuple(Vec<DataType>),
    /// Key/value entries.
    Map(Box<DataType>, Box<DataType>),
}

/// Deepest composite nesting accepted by [`DataType::parse`].
pub const MAX_NESTING_DEPTH: usize = 128;

type Constructor = fn(&str, usize) -> Result<DataType, TypeError>;

const SCALARS: &[(&str, DataType)] = &[
    ("String", DataType::String),
    ("UInt8", DataType::UInt8),
    ("UInt16", DataType::UInt16),
    ("UInt32", DataType::UInt32),
    ("UInt64", DataType::UInt64),
    ("Int8", DataType::Int8),
    ("Int16", DataType::Int16),
    ("Int32", DataType::Int32),
    ("Int64", DataType::Int64),
    ("Float32", DataType::Float32),
    ("Float64", DataType::Float64),
    ("Date", DataType::Date),
    ("DateTime", DataType::DateTime),
];

const COMPOSITES: &[(&str, Constructor)] = &[
    ("Array", array),
    ("Nullable", nullable),
    ("LowCardinality", low_cardinality),
    ("Tuple", tuple),
    ("Map", map),
];

fn array(inner: &str, depth: usize) -> Result<DataType, TypeError> {
    Ok(DataType::Array(Box::new(DataType::parse_nested(inner, depth)?)))
}

fn nullable(inner: &str, depth: usize) -> Result<DataType, TypeError> {
    Ok(DataType::Nullable(Box::new(DataType::parse_nested(inner, depth)?)))
}

fn low_cardinality(inner: &str, depth: usize) -> Result<DataType, TypeError> {
    Ok(DataType::LowCardinality(Box::new(DataType::parse_nested(inner, depth)?)))
}

fn tuple(inner: &str, depth: usize) -> Result<DataType, TypeError> {
    let elements = split_arguments(inner)?
        .into_iter()
        .map(|element| DataType::parse_nested(element, depth))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DataType::Tuple(elements))
}

fn map(inner: &str, depth: usize) -> Result<DataType, TypeError> {
    let (key, value) = split_map_arguments(inner)?;
    Ok(DataType::Map(
        Box::new(DataType::parse_nested(key, depth)?),
        Box::new(DataType::parse_nested(value, depth)?),
    ))
}

impl DataType {
    /// Parse a type descriptor.
    ///
    /// Descriptors nested more than [`MAX_NESTING_DEPTH`] composites deep
    /// are rejected as malformed.
    pub fn parse(descriptor: &str) -> Result<Self, TypeError> {
        Self::parse_nested(descriptor, 0)
    }

    /// `depth` counts the composites enclosing `descriptor`.
    fn parse_nested(descriptor: &str, depth: usize) -> Result<Self, TypeError> {
        let descriptor = descriptor.trim();

        if let Some((_, scalar)) = SCALARS.iter().find(|(name, _)| *name == descriptor) {
            return Ok(scalar.clone());
        }

        let Some(open) = descriptor.find('(') else {
            return Err(TypeError::UnknownType(descriptor.to_string()));
        };
        let name = descriptor[..open].trim();
        let Some((_, construct)) = COMPOSITES.iter().find(|(n, _)| *n == name) else {
            return Err(TypeError::UnknownType(descriptor.to_string()));
        };
        if depth >= MAX_NESTING_DEPTH {
            return Err(TypeError::MalformedDescriptor(format!(
                "nesting deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }

        let close = matching_paren(descriptor, open)
            .ok_or_else(|| TypeError::MalformedDescriptor(descriptor.to_string()))?;
        if close != descriptor.len() - 1 {
            return Err(TypeError::MalformedDescriptor(descriptor.to_string()));
        }
        construct(&descriptor[open + 1..close], depth + 1)
    }

    /// Top-level type name (`Array` for `Array(UInt8)`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::UInt8 => "UInt8",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Array(_) => "Array",
            Self::Nullable(_) => "Nullable",
            Self::LowCardinality(_) => "LowCardinality",
            Self::Tuple(_) => "Tuple",
            Self::Map(_, _) => "Map",
        }
    }

    /// Check if NULL is a valid value of this type.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Nullable(_) => true,
            Self::LowCardinality(inner) => inner.is_nullable(),
            _ => false,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(inner) | Self::Nullable(inner) | Self::LowCardinality(inner) => {
                write!(f, "{}({inner})", self.name())
            }
            Self::Tuple(elements) => {
                f.write_str("Tuple(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str(")")
            }
            Self::Map(key, value) => write!(f, "Map({key}, {value})"),
            scalar => f.write_str(scalar.name()),
        }
    }
}

/// Byte offset of the `)` that closes the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list on top-level commas.
///
/// Commas nested inside parentheses do not split. Each argument is trimmed.
pub fn split_arguments(args: &str) -> Result<Vec<&str>, TypeError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| TypeError::MalformedDescriptor(args.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(TypeError::MalformedDescriptor(args.to_string()));
    }
    parts.push(args[start..].trim());
    Ok(parts)
}

/// Split a `Map` argument list into exactly a key and a value type.
pub fn split_map_arguments(args: &str) -> Result<(&str, &str), TypeError> {
    let parts = split_arguments(args)?;
    match parts.as_slice() {
        [key, value] => Ok((key, value)),
        _ => Err(TypeError::InvalidArguments {
            type_name: "Map",
            expected: 2,
            actual: parts.len(),
        }),
    }
}
