//! Legacy compact lists: loading, classification and index registration.
//!
//! A compact list stores all of its elements inside the object value. Writers
//! of such objects register an index entry next to them (see [`register`]);
//! the migration engine later loads each indexed object through [`load`],
//! which either yields a [`LegacyList`] ready for conversion or explains why the
//! index entry is stale.

use crate::backend::KvTransaction;
use crate::error::MigrateResult;
use crate::keys::{INDEX_SENTINEL, IndexNamespace, ObjectKey};
use crate::object::{ObjectEncoding, ObjectEnvelope, ObjectType, decode_config};
use crate::utils::datetime::{expiry_datetime, is_expired, now_millis};
use log::{debug, error};
use strum::{AsRefStr, Display};

/// Why an index entry no longer points at a migratable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum StaleReason {
    /// The object was deleted
    Missing,
    /// The object is not a list
    TypeMismatch,
    /// The list is not compact-encoded
    EncodingMismatch,
    /// The list expired
    Expired,
}

/// Outcome of loading an indexed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Legacy(LegacyList),
    Stale(StaleReason),
}

/// Decoded compact list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyList {
    key: ObjectKey,
    expire_at: Option<i64>,
    items: Vec<Vec<u8>>,
}

impl LegacyList {
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn expire_at(&self) -> Option<i64> {
        self.expire_at
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Load the object at `key` and classify it against the current wall time.
pub fn load<T: KvTransaction + ?Sized>(txn: &T, key: &ObjectKey) -> MigrateResult<Loaded> {
    load_at(txn, key, now_millis())
}

/// Load the object at `key`, treating `now` (Unix ms) as the current time.
pub fn load_at<T: KvTransaction + ?Sized>(
    txn: &T,
    key: &ObjectKey,
    now: i64,
) -> MigrateResult<Loaded> {
    let Some(bytes) = txn.get(key.as_bytes())? else {
        return Ok(Loaded::Stale(StaleReason::Missing));
    };
    let envelope = ObjectEnvelope::decode(&bytes)?;

    match (envelope.object_type, envelope.encoding) {
        (ObjectType::List, ObjectEncoding::CompactList) => {}
        (ObjectType::List, encoding) => {
            error!(
                "Loader: indexed list {} has encoding {}, expected {}",
                key,
                encoding,
                ObjectEncoding::CompactList
            );
            return Ok(Loaded::Stale(StaleReason::EncodingMismatch));
        }
        (_, _) => return Ok(Loaded::Stale(StaleReason::TypeMismatch)),
    }

    if is_expired(envelope.expire_at, now) {
        if let Some(at) = envelope.expire_at {
            debug!("Loader: compact list {} expired at {:?}", key, expiry_datetime(at));
        }
        return Ok(Loaded::Stale(StaleReason::Expired));
    }

    let items = decode_compact_body(&envelope.body)?;
    Ok(Loaded::Legacy(LegacyList {
        key: key.clone(),
        expire_at: envelope.expire_at,
        items,
    }))
}

/// Record that `key` holds a compact list awaiting migration.
pub fn register<T: KvTransaction + ?Sized>(
    txn: &mut T,
    namespace: &IndexNamespace,
    key: &ObjectKey,
) -> MigrateResult<()> {
    debug!("Loader: compact list {} recorded in index", key);
    txn.set(&namespace.to_index_key(key.as_bytes()), INDEX_SENTINEL)
}

/// Remove the index entry of `key`.
pub fn unregister<T: KvTransaction + ?Sized>(
    txn: &mut T,
    namespace: &IndexNamespace,
    key: &ObjectKey,
) -> MigrateResult<()> {
    txn.delete(&namespace.to_index_key(key.as_bytes()))
}

/// True if `key` still has an index entry.
pub fn is_registered<T: KvTransaction + ?Sized>(
    txn: &T,
    namespace: &IndexNamespace,
    key: &ObjectKey,
) -> MigrateResult<bool> {
    Ok(txn.get(&namespace.to_index_key(key.as_bytes()))?.is_some())
}

/// Write a compact list at `key` and register it, in the caller's transaction.
pub fn write_legacy_list<T, I, V>(
    txn: &mut T,
    namespace: &IndexNamespace,
    key: &ObjectKey,
    items: I,
    expire_at: Option<i64>,
) -> MigrateResult<()>
where
    T: KvTransaction + ?Sized,
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    let items: Vec<Vec<u8>> = items.into_iter().map(Into::into).collect();
    let body = bincode::encode_to_vec(&items, bincode::config::standard())?;
    let envelope = ObjectEnvelope::new(ObjectType::List, ObjectEncoding::CompactList, body)
        .with_expiry(expire_at);
    txn.set(key.as_bytes(), &envelope.encode()?)?;
    register(txn, namespace, key)
}

fn decode_compact_body(body: &[u8]) -> MigrateResult<Vec<Vec<u8>>> {
    let (items, _) = bincode::decode_from_slice(body, decode_config())?;
    Ok(items)
}
