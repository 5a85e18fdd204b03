//! Index key codec.
//!
//! An index entry flags an object that may still be stored with the legacy
//! compact list encoding. The entry lives in a reserved namespace of the
//! system database:
//!
//! ```text
//! <namespace> ':' <database-id byte> ':' 'Z' 'T' ':' <object key>
//! ```
//!
//! and its value is a single zero byte. Only the *presence* of the key matters.

use derive_more::{From, Into};
use serde::Deserialize;
use std::fmt;

/// Value stored under every index key.
pub const INDEX_SENTINEL: &[u8] = &[0];

const INDEX_TAG: &[u8] = b"ZT";

/// Location of the index namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexNamespace {
    /// System namespace bytes
    pub namespace: String,
    /// System database id, written as a single raw byte
    pub database_id: u8,
}

impl Default for IndexNamespace {
    fn default() -> Self {
        Self {
            namespace: "$sys".to_string(),
            database_id: 0,
        }
    }
}

impl IndexNamespace {
    pub fn new<S: Into<String>>(namespace: S, database_id: u8) -> Self {
        Self {
            namespace: namespace.into(),
            database_id,
        }
    }

    /// Derive the index key for an object key.
    pub fn to_index_key(&self, object_key: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix_len() + object_key.len());
        key.extend_from_slice(self.namespace.as_bytes());
        key.push(b':');
        key.push(self.database_id);
        key.push(b':');
        key.extend_from_slice(INDEX_TAG);
        key.push(b':');
        key.extend_from_slice(object_key);
        key
    }

    /// Recover the object key from an index key.
    ///
    /// Callers only pass keys obtained from a prefix-scoped scan; a key shorter
    /// than the prefix yields an empty slice.
    pub fn strip_index_key<'a>(&self, index_key: &'a [u8]) -> &'a [u8] {
        debug_assert!(self.contains(index_key));
        index_key.get(self.prefix_len()..).unwrap_or_default()
    }

    /// The namespace prefix, i.e. the index key of an empty object key.
    pub fn prefix(&self) -> Vec<u8> {
        self.to_index_key(&[])
    }

    pub fn prefix_len(&self) -> usize {
        self.namespace.len() + 3 + INDEX_TAG.len() + 1
    }

    /// Exclusive upper bound of the namespace.
    pub fn upper_bound(&self) -> Vec<u8> {
        prefix_next(&self.prefix())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.prefix())
    }

    /// Cursor positioned at the start of the namespace.
    pub fn lower_bound(&self) -> Cursor {
        Cursor(self.prefix())
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// A prefix made only of `0xFF` bytes has no such bound; the prefix followed by
/// a zero byte is returned and callers must keep checking the prefix.
pub fn prefix_next(prefix: &[u8]) -> Vec<u8> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return next;
        }
        next.pop();
    }
    let mut next = prefix.to_vec();
    next.push(0);
    next
}

/// Raw identifier of an object in the primary keyspace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct ObjectKey(Vec<u8>);

impl ObjectKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ObjectKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for ObjectKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey(\"{}\")", self.0.escape_ascii())
    }
}

/// Position where the next scan pass resumes: an index key, or the namespace
/// lower bound. Kept in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Cursor(Vec<u8>);

impl Cursor {
    pub fn at(index_key: &[u8]) -> Self {
        Self(index_key.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor(\"{}\")", self.0.escape_ascii())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_key_layout() {
        let ns = IndexNamespace::default();
        let key = ns.to_index_key(b"list:A");
        assert_eq!(key, b"$sys:\x00:ZT:list:A".to_vec());
        assert_eq!(ns.prefix(), b"$sys:\x00:ZT:".to_vec());
        assert_eq!(ns.prefix_len(), ns.prefix().len());
    }

    #[test]
    fn test_strip_index_key() {
        let ns = IndexNamespace::new("$meta", 7);
        let key = ns.to_index_key(b"\x00\xffraw");
        assert!(ns.contains(&key));
        assert_eq!(ns.strip_index_key(&key), b"\x00\xffraw");
    }

    #[test]
    fn test_upper_bound_orders_after_namespace() {
        let ns = IndexNamespace::default();
        let upper = ns.upper_bound();
        assert_eq!(upper, b"$sys:\x00:ZT;".to_vec());
        assert!(ns.to_index_key(&[0xff; 8]) < upper);
        assert!(ns.prefix() < upper);
    }

    #[test]
    fn test_prefix_next_carries() {
        assert_eq!(prefix_next(b"a\xff\xff"), b"b".to_vec());
        assert_eq!(prefix_next(b"ab"), b"ac".to_vec());
        assert_eq!(prefix_next(b"\xff"), b"\xff\x00".to_vec());
    }

    quickcheck::quickcheck! {
        fn prop_index_keys_stay_in_namespace(namespace: String, database_id: u8, key: Vec<u8>) -> bool {
            let ns = IndexNamespace::new(namespace, database_id);
            let index_key = ns.to_index_key(&key);
            ns.contains(&index_key)
                && ns.lower_bound().as_bytes() <= index_key.as_slice()
                && index_key < ns.upper_bound()
                && ns.strip_index_key(&index_key) == key.as_slice()
        }
    }

    #[test]
    fn test_object_key_display_escapes() {
        let key = ObjectKey::from(&b"k\x01"[..]);
        assert_eq!(key.to_string(), "k\\x01");
        let raw: Vec<u8> = key.into();
        assert_eq!(raw, b"k\x01".to_vec());
    }
}
