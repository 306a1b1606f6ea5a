//! Binary identity of an aggregate instance.
//!
//! The identity is 24 bytes, big-endian, in field order:
//! `source_id: i64 | domain_id: i32 | id: i64 | version: i32`.
//!
//! Two representations share the [`AggregateHeader`] read contract:
//! [`AggregateHeaderData`] decodes once and reads fields directly, while
//! [`AggregateBodyData`] keeps only the raw bytes and decodes on every access.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the encoded header.
pub const HEADER_BYTES: usize = 24;

/// Errors raised when wrapping raw header bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The buffer cannot hold a full header.
    #[error("aggregate header requires {HEADER_BYTES} bytes, got {0}")]
    TooShort(usize),
}

/// Read contract shared by both header representations.
pub trait AggregateHeader {
    /// Returns the source (system of record) hash.
    fn source_id(&self) -> i64;

    /// Returns the domain (aggregate type) id.
    fn domain_id(&self) -> i32;

    /// Returns the aggregate id, unique within source and domain.
    fn id(&self) -> i64;

    /// Returns the aggregate version.
    fn version(&self) -> i32;

    /// Returns the raw 24-byte encoding.
    fn uuid(&self) -> Vec<u8>;

    /// Materializes the structured form.
    fn body(&self) -> AggregateHeaderData;
}

fn write_header(f: &mut fmt::Formatter<'_>, header: &impl AggregateHeader) -> fmt::Result {
    write!(
        f,
        "{:X}|{:X}|{:X}|{:X}",
        header.source_id() as u64,
        header.domain_id() as u32,
        header.id() as u64,
        header.version() as u32
    )
}

fn read_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(buf)
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0_u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_be_bytes(buf)
}

fn take<'a>(cursor: &mut &'a [u8], n: usize) -> &'a [u8] {
    let current: &'a [u8] = *cursor;
    let (head, tail) = current.split_at(n);
    *cursor = tail;
    head
}

/// Structured aggregate header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AggregateHeaderData {
    /// Hash identifying the system of record.
    #[serde(rename = "_source")]
    pub source_id: i64,

    /// Aggregate type within the source.
    #[serde(rename = "_domain")]
    pub domain_id: i32,

    /// Aggregate instance id within source and domain.
    #[serde(rename = "_id")]
    pub id: i64,

    /// Deterministic event order within the instance.
    #[serde(rename = "_ver")]
    pub version: i32,
}

impl AggregateHeaderData {
    /// Creates a header from its four fields.
    pub fn new(source_id: i64, domain_id: i32, id: i64, version: i32) -> Self {
        Self {
            source_id,
            domain_id,
            id,
            version,
        }
    }

    /// Encodes the header as 24 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let mut out = [0_u8; HEADER_BYTES];
        out[0..8].copy_from_slice(&self.source_id.to_be_bytes());
        out[8..12].copy_from_slice(&self.domain_id.to_be_bytes());
        out[12..20].copy_from_slice(&self.id.to_be_bytes());
        out[20..24].copy_from_slice(&self.version.to_be_bytes());
        out
    }

    /// Decodes the first 24 bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_BYTES {
            return Err(HeaderError::TooShort(bytes.len()));
        }
        Ok(Self {
            source_id: read_i64(&bytes[0..8]),
            domain_id: read_i32(&bytes[8..12]),
            id: read_i64(&bytes[12..20]),
            version: read_i32(&bytes[20..24]),
        })
    }

    /// Returns the raw-bytes form of this header.
    pub fn to_raw(&self) -> AggregateBodyData {
        AggregateBodyData {
            data: self.to_bytes().to_vec(),
        }
    }
}

impl AggregateHeader for AggregateHeaderData {
    fn source_id(&self) -> i64 {
        self.source_id
    }

    fn domain_id(&self) -> i32 {
        self.domain_id
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn uuid(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn body(&self) -> AggregateHeaderData {
        *self
    }
}

impl fmt::Display for AggregateHeaderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)
    }
}

#[derive(Serialize, Deserialize)]
struct RawBody {
    #[serde(rename = "_data")]
    data: Vec<u8>,
}

/// Raw-bytes aggregate header, optionally followed by a serialized state blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBody", into = "RawBody")]
pub struct AggregateBodyData {
    data: Vec<u8>,
}

impl AggregateBodyData {
    /// Wraps raw bytes, which must start with a full header.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, HeaderError> {
        if data.len() < HEADER_BYTES {
            return Err(HeaderError::TooShort(data.len()));
        }
        Ok(Self { data })
    }

    /// Returns the bytes following the header.
    pub fn state_bytes(&self) -> &[u8] {
        &self.data[HEADER_BYTES..]
    }

    /// Returns the complete buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<RawBody> for AggregateBodyData {
    type Error = HeaderError;

    fn try_from(raw: RawBody) -> Result<Self, Self::Error> {
        Self::from_bytes(raw.data)
    }
}

impl From<AggregateBodyData> for RawBody {
    fn from(body: AggregateBodyData) -> Self {
        RawBody { data: body.data }
    }
}

impl From<AggregateHeaderData> for AggregateBodyData {
    fn from(header: AggregateHeaderData) -> Self {
        header.to_raw()
    }
}

impl AggregateHeader for AggregateBodyData {
    fn source_id(&self) -> i64 {
        read_i64(&self.data[0..8])
    }

    fn domain_id(&self) -> i32 {
        read_i32(&self.data[8..12])
    }

    fn id(&self) -> i64 {
        read_i64(&self.data[12..20])
    }

    fn version(&self) -> i32 {
        read_i32(&self.data[20..24])
    }

    fn uuid(&self) -> Vec<u8> {
        self.data[..HEADER_BYTES].to_vec()
    }

    fn body(&self) -> AggregateHeaderData {
        let mut cursor = self.data.as_slice();
        let source_id = read_i64(take(&mut cursor, 8));
        let domain_id = read_i32(take(&mut cursor, 4));
        let id = read_i64(take(&mut cursor, 8));
        let version = read_i32(take(&mut cursor, 4));
        AggregateHeaderData::new(source_id, domain_id, id, version)
    }
}

impl fmt::Display for AggregateBodyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self)
    }
}

/// Builds an on-disk aggregate snapshot record: the header followed by `state`.
pub fn new_aggregate(header: AggregateHeaderData, state: &[u8]) -> AggregateBodyData {
    let mut data = Vec::with_capacity(HEADER_BYTES + state.len());
    data.extend_from_slice(&header.to_bytes());
    data.extend_from_slice(state);
    AggregateBodyData { data }
}
