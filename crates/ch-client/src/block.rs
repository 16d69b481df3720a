//! Result blocks and their decoding.
//!
//! A block arrives as a framed header (block info, temporary table names,
//! column count, row count, column names and types) followed by the values,
//! row by row, each column in declaration order.

use std::sync::Arc;

use ch_codec::InputStream;
use ch_types::Value;
use native_protocol::{BlockHeader, BlockInfo};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::row::{Column, Row};
use crate::type_cache::TypeCache;

/// A chunk of tabular result data.
///
/// Every row has exactly the block's columns, in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    columns: Arc<[Column]>,
    rows: Vec<Row>,
    info: BlockInfo,
}

impl Block {
    /// Create a block with no rows.
    #[must_use]
    pub fn new(columns: Vec<Column>, info: BlockInfo) -> Self {
        Self {
            columns: Arc::from(columns),
            rows: Vec::new(),
            info,
        }
    }

    /// Append a row of values in column order.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        let row = Row::new(Arc::clone(&self.columns), values)?;
        self.rows.push(row);
        Ok(())
    }

    /// Column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Column type descriptors in order.
    pub fn column_types(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.type_name.as_str())
    }

    /// Rows of this block.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Take the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Block info (overflow flag and bucket number).
    #[must_use]
    pub fn info(&self) -> BlockInfo {
        self.info
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the block has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read one block body; the packet code and temporary table name have
    /// already been consumed.
    ///
    /// Temporary table names in the header are read and discarded. A value
    /// that fails to decode is reported as [`Error::Column`] naming the
    /// column and its type.
    pub(crate) async fn read<S>(input: &mut InputStream<S>, types: &mut TypeCache) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let header = input.read_frame(|src| BlockHeader::decode(src)).await?;
        if !header.temporary_tables.is_empty() {
            tracing::debug!(
                tables = ?header.temporary_tables,
                "skipping temporary table names"
            );
        }

        let mut codecs = Vec::with_capacity(header.columns.len());
        for column in &header.columns {
            let data_type = types
                .get_or_parse(&column.type_name)
                .map_err(|source| Error::Column {
                    name: column.name.clone(),
                    type_name: column.type_name.clone(),
                    source,
                })?;
            codecs.push(data_type);
        }

        let columns: Vec<Column> = header
            .columns
            .into_iter()
            .map(|c| Column::new(c.name, c.type_name))
            .collect();
        let mut block = Self::new(columns, header.info);
        tracing::debug!(
            columns = block.column_count(),
            rows = header.rows,
            "reading block"
        );

        for _ in 0..header.rows {
            let mut values = Vec::with_capacity(codecs.len());
            for (column, codec) in block.columns.iter().zip(&codecs) {
                let value = codec.read_value(input).await.map_err(|source| Error::Column {
                    name: column.name.clone(),
                    type_name: column.type_name.clone(),
                    source,
                })?;
                values.push(value);
            }
            block.push_row(values)?;
        }

        Ok(block)
    }
}
