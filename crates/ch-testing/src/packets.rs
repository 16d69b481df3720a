//! Server packet sequences for mock and scripted servers.
//!
//! [`ServerPackets`] writes server-to-client packets back to back into one
//! buffer, the way a server would stream them for a single query.

use bytes::Bytes;
use ch_codec::OutputStream;
use ch_types::{DataType, TypeError, Value};
use native_protocol::codec::put_string;
use native_protocol::{
    BlockHeader, ColumnHeader, ExceptionPacket, ProfileInfo, Progress, ServerCode, ServerHello,
    encode_code,
};

/// Column declaration for mock result blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Type descriptor.
    pub type_name: String,
}

impl MockColumn {
    /// Create a column with any type descriptor.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a `UInt8` column.
    pub fn uint8(name: impl Into<String>) -> Self {
        Self::new(name, "UInt8")
    }

    /// Create a `UInt64` column.
    pub fn uint64(name: impl Into<String>) -> Self {
        Self::new(name, "UInt64")
    }

    /// Create an `Int32` column.
    pub fn int32(name: impl Into<String>) -> Self {
        Self::new(name, "Int32")
    }

    /// Create a `String` column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, "String")
    }

    /// Wrap this column's type in `Nullable`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.type_name = format!("Nullable({})", self.type_name);
        self
    }
}

/// Builder for a server packet byte sequence.
#[derive(Debug, Default)]
pub struct ServerPackets {
    out: OutputStream,
}

impl ServerPackets {
    /// Start an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a server hello.
    #[must_use]
    pub fn hello(mut self, hello: &ServerHello) -> Self {
        hello.encode(self.out.buffer_mut());
        self
    }

    /// Append a DATA packet.
    ///
    /// Rows are written row-major. A row whose length differs from the
    /// column count fails with [`TypeError::TupleArity`].
    pub fn data(self, columns: &[MockColumn], rows: &[Vec<Value>]) -> Result<Self, TypeError> {
        self.block(ServerCode::Data, columns, rows)
    }

    /// Append a TOTALS packet.
    pub fn totals(self, columns: &[MockColumn], rows: &[Vec<Value>]) -> Result<Self, TypeError> {
        self.block(ServerCode::Totals, columns, rows)
    }

    /// Append an EXTREMES packet.
    pub fn extremes(self, columns: &[MockColumn], rows: &[Vec<Value>]) -> Result<Self, TypeError> {
        self.block(ServerCode::Extremes, columns, rows)
    }

    /// Append a PROGRESS packet.
    #[must_use]
    pub fn progress(mut self, rows: u64, bytes: u64, total_rows: u64) -> Self {
        Progress {
            rows,
            bytes,
            total_rows,
        }
        .encode(self.out.buffer_mut());
        self
    }

    /// Append a PROFILE_INFO packet.
    #[must_use]
    pub fn profile_info(mut self, rows_read: u64, bytes_read: u64, elapsed_seconds: f64) -> Self {
        ProfileInfo {
            rows_read,
            bytes_read,
            elapsed_seconds,
        }
        .encode(self.out.buffer_mut());
        self
    }

    /// Append an EXCEPTION packet.
    #[must_use]
    pub fn exception(mut self, exception: &ExceptionPacket) -> Self {
        exception.encode(self.out.buffer_mut());
        self
    }

    /// Append a PONG packet.
    #[must_use]
    pub fn pong(mut self) -> Self {
        encode_code(self.out.buffer_mut(), ServerCode::Pong);
        self
    }

    /// Append an END_OF_STREAM packet.
    #[must_use]
    pub fn end_of_stream(mut self) -> Self {
        encode_code(self.out.buffer_mut(), ServerCode::EndOfStream);
        self
    }

    /// Append arbitrary bytes.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.write_bytes(bytes);
        self
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out.pending().len()
    }

    /// Check if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Finish the sequence.
    #[must_use]
    pub fn build(mut self) -> Bytes {
        self.out.buffer_mut().split().freeze()
    }

    fn block(
        mut self,
        code: ServerCode,
        columns: &[MockColumn],
        rows: &[Vec<Value>],
    ) -> Result<Self, TypeError> {
        let types = columns
            .iter()
            .map(|c| DataType::parse(&c.type_name))
            .collect::<Result<Vec<_>, _>>()?;

        let buf = self.out.buffer_mut();
        encode_code(buf, code);
        // Temporary table name.
        put_string(buf, "");
        BlockHeader {
            columns: columns
                .iter()
                .map(|c| ColumnHeader::new(&c.name, &c.type_name))
                .collect(),
            rows: rows.len() as u64,
            ..BlockHeader::default()
        }
        .encode(buf);

        for row in rows {
            if row.len() != types.len() {
                return Err(TypeError::TupleArity {
                    expected: types.len(),
                    actual: row.len(),
                });
            }
            for (ty, value) in types.iter().zip(row) {
                ty.write_value(&mut self.out, value)?;
            }
        }
        Ok(self)
    }
}
