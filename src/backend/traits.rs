/// Backend trait definitions.
///
/// A backend exposes snapshot-isolated transactions over a single ordered
/// byte keyspace. Writes become visible atomically on commit and are discarded
/// on rollback.
use crate::error::MigrateResult;
use std::ops::ControlFlow;

/// Callback driven by [`KvTransaction::scan`] for each entry in key order.
///
/// Returning `ControlFlow::Break` stops the scan.
pub type ScanVisitor<'a> = dyn FnMut(&[u8], &[u8]) -> MigrateResult<ControlFlow<()>> + 'a;

/// Transaction over the store.
pub trait KvTransaction {
    /// Get a value by key, returns None if not found
    fn get(&self, key: &[u8]) -> MigrateResult<Option<Vec<u8>>>;

    /// Insert or overwrite a key
    fn set(&mut self, key: &[u8], value: &[u8]) -> MigrateResult<()>;

    /// Remove a key; removing an absent key is not an error
    fn delete(&mut self, key: &[u8]) -> MigrateResult<()>;

    /// Visit every entry in `[start, end)` in ascending key order.
    fn scan(&self, start: &[u8], end: &[u8], visit: &mut ScanVisitor<'_>) -> MigrateResult<()>;

    /// Commit the transaction, making all changes durable
    fn commit(self) -> MigrateResult<()>
    where
        Self: Sized;

    /// Abort the transaction, discarding all changes
    fn rollback(self) -> MigrateResult<()>
    where
        Self: Sized;
}

/// Main backend store interface.
pub trait KvStore: Send + Sync + 'static {
    type Txn: KvTransaction;

    /// Begin a read-write transaction
    fn begin(&self) -> MigrateResult<Self::Txn>;
}
