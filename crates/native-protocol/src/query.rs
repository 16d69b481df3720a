//! Query packet encoding.
//!
//! A query packet carries the query id, a client info block describing
//! who is asking, the session settings, the processing stage, the
//! compression flag and the query text. It is always followed on the wire
//! by a data block; for plain queries that block is empty (see
//! [`crate::block::encode_empty_block`]).

use bytes::{Buf, BufMut};

use crate::codec::{get_string, get_varint, put_string, put_varint};
use crate::error::ProtocolError;
use crate::packet::ClientCode;
use crate::revision::Revision;

/// Client name carried in a query's client info.
pub const CLIENT_NAME: &str = "clickhouse-native";

/// Address reported as the query's initial address.
pub const INITIAL_ADDRESS: &str = "127.0.0.1:0";

/// Query kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum QueryKind {
    /// No query.
    NoQuery = 0,
    /// Query issued directly by a client.
    #[default]
    Initial = 1,
    /// Query forwarded by another server.
    Secondary = 2,
}

impl QueryKind {
    /// Decode from a wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::NoQuery),
            1 => Ok(Self::Initial),
            2 => Ok(Self::Secondary),
            _ => Err(ProtocolError::MalformedPacket(format!(
                "invalid query kind: {value}"
            ))),
        }
    }
}

/// Stage up to which the server should process the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum QueryStage {
    /// Only resolve result columns.
    FetchColumns = 0,
    /// Stop at a state that can still be merged.
    WithMergeableState = 1,
    /// Run to completion.
    #[default]
    Complete = 2,
}

impl QueryStage {
    /// Decode from a wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::FetchColumns),
            1 => Ok(Self::WithMergeableState),
            2 => Ok(Self::Complete),
            _ => Err(ProtocolError::MalformedPacket(format!(
                "invalid query stage: {value}"
            ))),
        }
    }
}

/// Whether data blocks following the query are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionState {
    /// Blocks are sent uncompressed.
    #[default]
    Disabled = 0,
    /// Blocks are sent compressed.
    Enabled = 1,
}

impl CompressionState {
    /// Map a boolean flag onto the wire value.
    #[must_use]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    /// Decode from a wire value.
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            _ => Err(ProtocolError::MalformedPacket(format!(
                "invalid compression state: {value}"
            ))),
        }
    }
}

/// Client info block embedded in a query packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Query kind.
    pub kind: QueryKind,
    /// User that issued the initial query.
    pub initial_user: String,
    /// Id of the initial query.
    pub initial_query_id: String,
    /// Address of the initial client.
    pub initial_address: String,
    /// Revision the query is encoded with; also gates later query fields.
    pub revision: Revision,
    /// Client software name.
    pub client_name: String,
    /// Client major version.
    pub version_major: u64,
    /// Client minor version.
    pub version_minor: u64,
    /// Client patch version.
    pub version_patch: u64,
    /// Quota key, empty when unused.
    pub quota_key: String,
}

impl ClientInfo {
    /// Client info for an initial query issued by `user`.
    #[must_use]
    pub fn initial(user: impl Into<String>, query_id: impl Into<String>, revision: Revision) -> Self {
        Self {
            kind: QueryKind::Initial,
            initial_user: user.into(),
            initial_query_id: query_id.into(),
            initial_address: INITIAL_ADDRESS.to_string(),
            revision,
            client_name: CLIENT_NAME.to_string(),
            version_major: 0,
            version_minor: 1,
            version_patch: 0,
            quota_key: String::new(),
        }
    }

    fn encode(&self, dst: &mut impl BufMut) {
        put_varint(dst, self.kind as u64);
        put_string(dst, &self.initial_user);
        put_string(dst, &self.initial_query_id);
        put_string(dst, &self.initial_address);
        put_varint(dst, self.revision.raw());
        put_string(dst, &self.client_name);
        put_varint(dst, self.version_major);
        put_varint(dst, self.version_minor);
        put_varint(dst, self.version_patch);
        put_string(dst, &self.quota_key);
    }

    fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: QueryKind::from_u64(get_varint(src)?)?,
            initial_user: get_string(src)?,
            initial_query_id: get_string(src)?,
            initial_address: get_string(src)?,
            revision: Revision::new(get_varint(src)?),
            client_name: get_string(src)?,
            version_major: get_varint(src)?,
            version_minor: get_varint(src)?,
            version_patch: get_varint(src)?,
            quota_key: get_string(src)?,
        })
    }
}

/// Query packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPacket {
    /// Query id, empty to let the server assign one.
    pub query_id: String,
    /// Client info block.
    pub client_info: ClientInfo,
    /// Settings as ordered (name, value) pairs.
    pub settings: Vec<(String, String)>,
    /// Interserver secret; only sent at revisions that carry it.
    pub interserver_secret: String,
    /// Processing stage.
    pub stage: QueryStage,
    /// Compression state for following data blocks.
    pub compression: CompressionState,
    /// Query text.
    pub query: String,
}

impl QueryPacket {
    /// Create an initial query packet with default stage and no settings.
    #[must_use]
    pub fn new(query: impl Into<String>, user: impl Into<String>, revision: Revision) -> Self {
        Self {
            query_id: String::new(),
            client_info: ClientInfo::initial(user, "", revision),
            settings: Vec::new(),
            interserver_secret: String::new(),
            stage: QueryStage::Complete,
            compression: CompressionState::Disabled,
            query: query.into(),
        }
    }

    /// Set the settings sent with the query.
    #[must_use]
    pub fn with_settings<I, K, V>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.settings = settings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set the compression state.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionState) -> Self {
        self.compression = compression;
        self
    }

    /// Revision gating the optional query fields.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.client_info.revision
    }

    /// Write the packet, code included.
    ///
    /// The trailing data block is not part of this packet.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let revision = self.revision();

        put_varint(dst, ClientCode::Query.as_u64());
        put_string(dst, &self.query_id);
        self.client_info.encode(dst);

        put_varint(dst, self.settings.len() as u64);
        for (name, value) in &self.settings {
            put_string(dst, name);
            put_string(dst, value);
        }
        // End of settings.
        put_string(dst, "");

        if revision.has_interserver_secret() {
            put_string(dst, &self.interserver_secret);
        }
        put_varint(dst, self.stage as u64);
        put_varint(dst, self.compression as u64);
        put_string(dst, &self.query);
        if revision.has_parameters() {
            // End of parameters.
            put_string(dst, "");
        }
    }

    /// Read the packet body; the code has already been consumed.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let query_id = get_string(src)?;
        let client_info = ClientInfo::decode(src)?;
        let revision = client_info.revision;

        let count = get_varint(src)?;
        let mut settings = Vec::new();
        for _ in 0..count {
            let name = get_string(src)?;
            let value = get_string(src)?;
            settings.push((name, value));
        }
        let sentinel = get_string(src)?;
        if !sentinel.is_empty() {
            return Err(ProtocolError::MalformedPacket(format!(
                "expected end of settings, got {sentinel:?}"
            )));
        }

        let interserver_secret = if revision.has_interserver_secret() {
            get_string(src)?
        } else {
            String::new()
        };
        let stage = QueryStage::from_u64(get_varint(src)?)?;
        let compression = CompressionState::from_u64(get_varint(src)?)?;
        let query = get_string(src)?;
        if revision.has_parameters() {
            get_string(src)?;
        }

        Ok(Self {
            query_id,
            client_info,
            settings,
            interserver_secret,
            stage,
            compression,
            query,
        })
    }
}
