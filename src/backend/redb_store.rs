//! Redb backend.
//!
//! All keys live in a single redb table mapping raw bytes to raw bytes. Every
//! engine transaction is a redb write transaction, which gives snapshot reads,
//! atomic commit and a full abort on rollback.

use crate::backend::traits::{KvStore, KvTransaction, ScanVisitor};
use crate::error::MigrateResult;
use log::debug;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const KV_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kv");

/// Shared handle to a redb database.
#[derive(Clone)]
pub struct RedbKvStore {
    db: Arc<Database>,
}

impl RedbKvStore {
    /// Create (or open) a database file at the given path
    pub fn create<P: AsRef<Path>>(path: P) -> MigrateResult<Self> {
        let start = Instant::now();
        debug!("RedbKvStore: Opening database at {}", path.as_ref().display());
        let db = Database::create(path)?;
        debug!("RedbKvStore: Opened in {:?}", start.elapsed());
        Ok(Self::from_database(Arc::new(db)))
    }

    /// Open an existing database file
    pub fn open<P: AsRef<Path>>(path: P) -> MigrateResult<Self> {
        let db = Database::open(path)?;
        Ok(Self::from_database(Arc::new(db)))
    }

    pub fn from_database(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get direct access to the underlying redb database
    pub fn db(&self) -> &Database {
        &self.db
    }
}

impl KvStore for RedbKvStore {
    type Txn = RedbKvTransaction;

    fn begin(&self) -> MigrateResult<Self::Txn> {
        let txn = self.db.begin_write()?;
        Ok(RedbKvTransaction { txn })
    }
}

/// Write transaction adapter for redb
pub struct RedbKvTransaction {
    txn: WriteTransaction,
}

impl KvTransaction for RedbKvTransaction {
    fn get(&self, key: &[u8]) -> MigrateResult<Option<Vec<u8>>> {
        let table = self.txn.open_table(KV_TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> MigrateResult<()> {
        let mut table = self.txn.open_table(KV_TABLE)?;
        table.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> MigrateResult<()> {
        let mut table = self.txn.open_table(KV_TABLE)?;
        table.remove(key)?;
        Ok(())
    }

    fn scan(&self, start: &[u8], end: &[u8], visit: &mut ScanVisitor<'_>) -> MigrateResult<()> {
        if start >= end {
            return Ok(());
        }
        let table = self.txn.open_table(KV_TABLE)?;
        for entry in table.range(start..end)? {
            let (key, value) = entry?;
            if visit(key.value(), value.value())?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn commit(self) -> MigrateResult<()> {
        let start = Instant::now();
        self.txn.commit()?;
        debug!("RedbKvTransaction: Committed in {:?}", start.elapsed());
        Ok(())
    }

    fn rollback(self) -> MigrateResult<()> {
        self.txn.abort()?;
        Ok(())
    }
}
