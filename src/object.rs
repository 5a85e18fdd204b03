//! Object envelope.
//!
//! Every object stored in the primary keyspace is an [`ObjectEnvelope`]: the
//! object type, the encoding of its body and an optional absolute expiry. The
//! body is opaque at this level and interpreted by the module owning the
//! encoding (`legacy` for compact lists, `convert` for linked lists).

use crate::error::MigrateResult;
use bincode::{Decode, Encode};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, Display, AsRefStr)]
pub enum ObjectType {
    String,
    List,
    Hash,
    Set,
    ZSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, Display, AsRefStr)]
pub enum ObjectEncoding {
    Raw,
    Int,
    /// Deprecated single-value list encoding
    CompactList,
    /// One data key per element
    LinkedList,
    HashTable,
    SkipList,
}

/// Largest allocation a decoder may make for one stored value.
pub const MAX_DECODE_BYTES: usize = 64 << 20;

/// Bincode configuration for every decode of stored data. A corrupt length
/// prefix fails with `LimitExceeded` instead of allocating.
pub(crate) fn decode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_DECODE_BYTES>()
}

/// Stored form of an object.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ObjectEnvelope {
    pub object_type: ObjectType,
    pub encoding: ObjectEncoding,
    /// Absolute expiry in Unix milliseconds
    pub expire_at: Option<i64>,
    pub body: Vec<u8>,
}

impl ObjectEnvelope {
    pub fn new(object_type: ObjectType, encoding: ObjectEncoding, body: Vec<u8>) -> Self {
        Self {
            object_type,
            encoding,
            expire_at: None,
            body,
        }
    }

    pub fn with_expiry(mut self, expire_at: Option<i64>) -> Self {
        self.expire_at = expire_at;
        self
    }

    pub fn encode(&self) -> MigrateResult<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn decode(bytes: &[u8]) -> MigrateResult<Self> {
        let (envelope, _) = bincode::decode_from_slice(bytes, decode_config())?;
        Ok(envelope)
    }
}
