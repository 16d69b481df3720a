//! Data block framing.
//!
//! Block bodies (the row values) depend on column types and are handled by
//! the type layer; this module covers the fixed framing around them.

use bytes::{Buf, BufMut};

use crate::codec::{get_string, get_varint, put_string, put_varint};
use crate::error::ProtocolError;

/// Block info field tag: end of the info section.
const FIELD_END: u64 = 0;
/// Block info field tag: overflow flag.
const FIELD_IS_OVERFLOWS: u64 = 1;
/// Block info field tag: bucket number.
const FIELD_BUCKET_NUM: u64 = 2;

/// Per-block metadata preceding the columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block holds rows beyond a `max_rows_to_group_by` overflow.
    pub is_overflows: bool,
    /// Two-level aggregation bucket number.
    pub bucket_num: u64,
}

impl BlockInfo {
    /// Write the tag/value sequence including the terminator.
    pub fn encode(&self, dst: &mut impl BufMut) {
        put_varint(dst, FIELD_IS_OVERFLOWS);
        put_varint(dst, u64::from(self.is_overflows));
        put_varint(dst, FIELD_BUCKET_NUM);
        put_varint(dst, self.bucket_num);
        put_varint(dst, FIELD_END);
    }

    /// Read tag/value pairs until the terminator.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let mut info = Self::default();
        loop {
            match get_varint(src)? {
                FIELD_END => return Ok(info),
                FIELD_IS_OVERFLOWS => info.is_overflows = get_varint(src)? != 0,
                FIELD_BUCKET_NUM => info.bucket_num = get_varint(src)?,
                other => return Err(ProtocolError::UnknownBlockInfoField(other)),
            }
        }
    }
}

/// Write the empty block that follows every query packet.
///
/// It tells the server the client has no rows of its own to send.
pub fn encode_empty_block(dst: &mut impl BufMut) {
    BlockInfo::default().encode(dst);
    put_varint(dst, 0); // columns
    put_varint(dst, 0); // rows
}

/// Read a client block and require it to be empty.
pub fn decode_empty_block(src: &mut impl Buf) -> Result<BlockInfo, ProtocolError> {
    let info = BlockInfo::decode(src)?;
    let columns = get_varint(src)?;
    let rows = get_varint(src)?;
    if columns != 0 || rows != 0 {
        return Err(ProtocolError::MalformedPacket(format!(
            "expected empty block, got {columns} columns and {rows} rows"
        )));
    }
    Ok(info)
}

/// Column declaration in a block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    /// Column name.
    pub name: String,
    /// Type descriptor, e.g. `Nullable(String)`.
    pub type_name: String,
}

impl ColumnHeader {
    /// Create a column declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Header of a block sent by the server.
///
/// Layout after the packet's temporary-table-name string: block info,
/// a count of temporary table names and the names themselves, column
/// count, row count, then one (name, type) pair per column. Row values
/// follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block info.
    pub info: BlockInfo,
    /// Temporary table names; bodies are not carried here.
    pub temporary_tables: Vec<String>,
    /// Column declarations in wire order.
    pub columns: Vec<ColumnHeader>,
    /// Number of rows that follow.
    pub rows: u64,
}

impl BlockHeader {
    /// Write the header.
    pub fn encode(&self, dst: &mut impl BufMut) {
        self.info.encode(dst);
        put_varint(dst, self.temporary_tables.len() as u64);
        for name in &self.temporary_tables {
            put_string(dst, name);
        }
        put_varint(dst, self.columns.len() as u64);
        put_varint(dst, self.rows);
        for column in &self.columns {
            put_string(dst, &column.name);
            put_string(dst, &column.type_name);
        }
    }

    /// Read the header.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let info = BlockInfo::decode(src)?;
        let table_count = get_varint(src)?;
        let mut temporary_tables = Vec::new();
        for _ in 0..table_count {
            temporary_tables.push(get_string(src)?);
        }
        let column_count = get_varint(src)?;
        let rows = get_varint(src)?;
        if column_count == 0 && rows > 0 {
            return Err(ProtocolError::MalformedPacket(format!(
                "block declares {rows} rows but no columns"
            )));
        }
        let mut columns = Vec::new();
        for _ in 0..column_count {
            let name = get_string(src)?;
            let type_name = get_string(src)?;
            columns.push(ColumnHeader { name, type_name });
        }
        Ok(Self {
            info,
            temporary_tables,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_empty_block_bytes() {
        let mut buf = BytesMut::new();
        encode_empty_block(&mut buf);
        assert_eq!(&buf[..], &[1, 0, 2, 0, 0, 0, 0]);

        let mut cursor = &buf[..];
        assert_eq!(decode_empty_block(&mut cursor).unwrap(), BlockInfo::default());
    }

    #[test]
    fn test_block_info_any_order() {
        let mut cursor: &[u8] = &[2, 7, 1, 1, 0];
        let info = BlockInfo::decode(&mut cursor).unwrap();
        assert!(info.is_overflows);
        assert_eq!(info.bucket_num, 7);
    }

    #[test]
    fn test_block_info_unknown_field() {
        let mut cursor: &[u8] = &[9, 0, 0];
        assert_eq!(
            BlockInfo::decode(&mut cursor),
            Err(ProtocolError::UnknownBlockInfoField(9))
        );
    }

    #[test]
    fn test_non_empty_client_block_rejected() {
        let mut cursor: &[u8] = &[0, 1, 0];
        assert!(matches!(
            decode_empty_block(&mut cursor),
            Err(ProtocolError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_block_header_roundtrip() {
        let header = BlockHeader {
            info: BlockInfo {
                is_overflows: false,
                bucket_num: 3,
            },
            temporary_tables: vec!["_tmp".into()],
            columns: vec![ColumnHeader::new("x", "UInt8"), ColumnHeader::new("s", "String")],
            rows: 2,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let mut cursor = &buf[..];
        assert_eq!(BlockHeader::decode(&mut cursor).unwrap(), header);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_rows_without_columns_rejected() {
        let mut buf = BytesMut::new();
        BlockInfo::default().encode(&mut buf);
        put_varint(&mut buf, 0);
        put_varint(&mut buf, 0);
        put_varint(&mut buf, u64::MAX);

        let mut cursor = &buf[..];
        assert!(matches!(
            BlockHeader::decode(&mut cursor),
            Err(ProtocolError::MalformedPacket(_))
        ));

        // Zero rows and zero columns is the ordinary empty block.
        let empty = BlockHeader::default();
        let mut buf = BytesMut::new();
        empty.encode(&mut buf);
        assert_eq!(BlockHeader::decode(&mut &buf[..]).unwrap(), empty);
    }
}
