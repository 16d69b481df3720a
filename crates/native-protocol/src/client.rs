//! Client packets as seen from the receiving side.
//!
//! A query packet is always followed by an empty block with no packet code
//! of its own, so [`ClientPacket::decode`] consumes both together.

use bytes::Buf;

use crate::block::{BlockInfo, decode_empty_block};
use crate::codec::{get_string, get_varint};
use crate::error::ProtocolError;
use crate::hello::ClientHello;
use crate::packet::ClientCode;
use crate::query::QueryPacket;

/// A decoded client packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    /// Handshake greeting.
    Hello(ClientHello),
    /// Query submission with its trailing empty block.
    Query(Box<QueryPacket>),
    /// Stand-alone data block.
    Data {
        /// Temporary table name.
        table: String,
        /// Block info of the (empty) block.
        info: BlockInfo,
    },
    /// Cancel request.
    Cancel,
    /// Keepalive request.
    Ping,
}

impl ClientPacket {
    /// Code of this packet.
    #[must_use]
    pub fn code(&self) -> ClientCode {
        match self {
            Self::Hello(_) => ClientCode::Hello,
            Self::Query(_) => ClientCode::Query,
            Self::Data { .. } => ClientCode::Data,
            Self::Cancel => ClientCode::Cancel,
            Self::Ping => ClientCode::Ping,
        }
    }

    /// Read one packet, code included.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        match ClientCode::from_u64(get_varint(src)?)? {
            ClientCode::Hello => Ok(Self::Hello(ClientHello::decode(src)?)),
            ClientCode::Query => {
                let query = QueryPacket::decode(src)?;
                decode_empty_block(src)?;
                Ok(Self::Query(Box::new(query)))
            }
            ClientCode::Data => {
                let table = get_string(src)?;
                let info = decode_empty_block(src)?;
                Ok(Self::Data { table, info })
            }
            ClientCode::Cancel => Ok(Self::Cancel),
            ClientCode::Ping => Ok(Self::Ping),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::block::encode_empty_block;
    use crate::revision::Revision;
    use bytes::BytesMut;

    #[test]
    fn test_query_consumes_trailing_block() {
        let query = QueryPacket::new("SELECT 1", "default", Revision::CLIENT);
        let mut buf = BytesMut::new();
        query.encode(&mut buf);
        encode_empty_block(&mut buf);
        buf.extend_from_slice(&[ClientCode::Ping as u8]);

        let mut cursor = &buf[..];
        let packet = ClientPacket::decode(&mut cursor).unwrap();
        assert_eq!(packet, ClientPacket::Query(Box::new(query)));
        assert_eq!(ClientPacket::decode(&mut cursor).unwrap(), ClientPacket::Ping);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_truncated_query_is_incomplete() {
        let mut buf = BytesMut::new();
        QueryPacket::new("SELECT 1", "default", Revision::CLIENT).encode(&mut buf);

        let mut cursor = &buf[..];
        assert!(ClientPacket::decode(&mut cursor).unwrap_err().is_incomplete());
    }

    #[test]
    fn test_unknown_code() {
        let mut cursor: &[u8] = &[9];
        assert_eq!(
            ClientPacket::decode(&mut cursor),
            Err(ProtocolError::UnknownClientCode(9))
        );
    }
}
