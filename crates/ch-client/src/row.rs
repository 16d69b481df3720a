//! Row representation for query results.
//!
//! A [`Row`] maps column names to values. Rows of one block share a single
//! column list through an `Arc`, so a row carries only its own values.
//!
//! ## Access Patterns
//!
//! - `get(name)` / `get_at(index)` - borrowed [`Value`], `None` if absent
//! - `get_as::<T>(name)` / `get_as_at::<T>(index)` - typed extraction via
//!   [`FromValue`]
//! - `iter()` - `(name, value)` pairs in column order

use std::sync::Arc;

use ch_types::{FromValue, Value};

use crate::error::{Error, Result};

/// Column metadata describing a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Type descriptor (e.g. `"Nullable(String)"`).
    pub type_name: String,
}

impl Column {
    /// Create a column description.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A single row from a query result.
#[derive(Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row.
    ///
    /// Fails if the value count differs from the column count.
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::RowWidth {
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(Self { columns, values })
    }

    /// Get a value by column name.
    ///
    /// With duplicate column names the first match wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }

    /// Get a value by position.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name, converted to `T`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let id: u64 = row.get_as("id")?;
    /// let email: Option<String> = row.get_as("email")?;
    /// ```
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        self.convert(index)
    }

    /// Get a value by position, converted to `T`.
    pub fn get_as_at<T: FromValue>(&self, index: usize) -> Result<T> {
        if index >= self.values.len() {
            return Err(Error::ColumnNotFound(format!("#{index}")));
        }
        self.convert(index)
    }

    fn convert<T: FromValue>(&self, index: usize) -> Result<T> {
        let column = &self.columns[index];
        T::from_value(&self.values[index]).map_err(|source| Error::Column {
            name: column.name.clone(),
            type_name: column.type_name.clone(),
            source,
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check if the named column holds NULL.
    ///
    /// Missing columns report `false`.
    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_null)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values, dropping the column names.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate `(name, value)` pairs in column order.
    pub fn iter(&self) -> RowIter<'_> {
        RowIter { row: self, index: 0 }
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over a row's `(name, value)` pairs.
#[derive(Debug)]
pub struct RowIter<'a> {
    row: &'a Row,
    index: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let column = self.row.columns.get(self.index)?;
        let value = self.row.values.get(self.index)?;
        self.index += 1;
        Some((column.name.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.row.values.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowIter<'_> {}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a str, &'a Value);
    type IntoIter = RowIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
