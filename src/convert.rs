//! Conversion of compact lists into linked lists.
//!
//! A linked list keeps only a small meta record at the object key and stores
//! each element under its own data key:
//!
//! ```text
//! "$data:" <16-byte object id> <big-endian u64 index>
//! ```
//!
//! The object id is derived from the object key, so converting the same
//! legacy list twice writes exactly the same keys.

use crate::backend::KvTransaction;
use crate::error::{MigrateError, MigrateResult};
use crate::keys::ObjectKey;
use crate::legacy::LegacyList;
use crate::object::{ObjectEncoding, ObjectEnvelope, ObjectType, decode_config};
use bincode::{Decode, Encode};

pub const DATA_PREFIX: &[u8] = b"$data:";

/// Rewrites a legacy list into its modern representation.
///
/// Implementations must be deterministic, must write only through `txn`, and
/// must leave nothing behind that a rollback of `txn` would not undo.
pub trait ListConverter: Send + Sync + 'static {
    fn convert(&self, txn: &mut dyn KvTransaction, legacy: LegacyList) -> MigrateResult<ModernList>;
}

/// Summary of a converted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModernList {
    pub key: ObjectKey,
    pub object_id: [u8; 16],
    pub len: u64,
}

/// Meta record stored as the body of a linked list envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct LinkedListMeta {
    pub object_id: [u8; 16],
    pub len: u64,
}

/// Default converter producing linked lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedListConverter;

impl ListConverter for LinkedListConverter {
    fn convert(&self, txn: &mut dyn KvTransaction, legacy: LegacyList) -> MigrateResult<ModernList> {
        let object_id = object_id(legacy.key());
        for (index, item) in legacy.items().iter().enumerate() {
            txn.set(&data_key(&object_id, index as u64), item)?;
        }

        let meta = LinkedListMeta {
            object_id,
            len: legacy.len() as u64,
        };
        let body = bincode::encode_to_vec(meta, bincode::config::standard())?;
        let envelope = ObjectEnvelope::new(ObjectType::List, ObjectEncoding::LinkedList, body)
            .with_expiry(legacy.expire_at());
        txn.set(legacy.key().as_bytes(), &envelope.encode()?)?;

        Ok(ModernList {
            key: legacy.key().clone(),
            object_id,
            len: meta.len,
        })
    }
}

/// Stable object id of a list, taken from the BLAKE3 hash of its key.
pub fn object_id(key: &ObjectKey) -> [u8; 16] {
    let hash = blake3::hash(key.as_bytes());
    let mut id = [0u8; 16];
    id.copy_from_slice(&hash.as_bytes()[..16]);
    id
}

pub fn data_key(object_id: &[u8; 16], index: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(DATA_PREFIX.len() + 16 + 8);
    key.extend_from_slice(DATA_PREFIX);
    key.extend_from_slice(object_id);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// Read back the elements of a linked list.
///
/// Returns `None` if `key` does not hold a linked list, and an error if any of
/// its elements is missing.
pub fn read_modern_list<T: KvTransaction + ?Sized>(
    txn: &T,
    key: &ObjectKey,
) -> MigrateResult<Option<Vec<Vec<u8>>>> {
    let Some(bytes) = txn.get(key.as_bytes())? else {
        return Ok(None);
    };
    let envelope = ObjectEnvelope::decode(&bytes)?;
    if envelope.object_type != ObjectType::List || envelope.encoding != ObjectEncoding::LinkedList {
        return Ok(None);
    }
    let (meta, _): (LinkedListMeta, usize) =
        bincode::decode_from_slice(&envelope.body, decode_config())?;

    let mut items = Vec::new();
    for index in 0..meta.len {
        let Some(item) = txn.get(&data_key(&meta.object_id, index))? else {
            return Err(MigrateError::CorruptObject(format!(
                "linked list {} is missing element {} of {}",
                key, index, meta.len
            )));
        };
        items.push(item);
    }
    Ok(Some(items))
}
