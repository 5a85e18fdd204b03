//! Backend abstraction layer.
//!
//! The migration engine only needs a transactional byte-keyed store. These
//! traits describe that collaborator; [`RedbKvStore`] is the production
//! implementation.

pub mod traits;
#[cfg(feature = "redb")]
pub mod redb_store;

pub use traits::{KvStore, KvTransaction, ScanVisitor};
#[cfg(feature = "redb")]
pub use redb_store::{RedbKvStore, RedbKvTransaction};
