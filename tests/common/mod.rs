// Common test utilities and helpers

#![allow(dead_code)]

use list_migrator::backend::{KvStore, KvTransaction, RedbKvStore, ScanVisitor};
use list_migrator::convert::{LinkedListConverter, ListConverter, ModernList, read_modern_list};
use list_migrator::error::{MigrateError, MigrateResult};
use list_migrator::keys::{IndexNamespace, ObjectKey};
use list_migrator::legacy::{self, LegacyList};
use list_migrator::object::ObjectEnvelope;
use list_migrator::queue::MigrationQueue;
use list_migrator::utils::now_millis;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Create a redb store in a fresh temporary directory
pub fn temp_store() -> (Arc<RedbKvStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RedbKvStore::create(dir.path().join("migrate.redb")).unwrap();
    (Arc::new(store), dir)
}

/// Write compact lists `(key, items)` and their index entries in one commit
pub fn seed<S: KvStore>(store: &S, ns: &IndexNamespace, lists: &[(&str, &[&str])]) {
    let mut txn = store.begin().unwrap();
    for (key, items) in lists {
        legacy::write_legacy_list(
            &mut txn,
            ns,
            &ObjectKey::from(*key),
            items.iter().copied(),
            None,
        )
        .unwrap();
    }
    txn.commit().unwrap();
}

/// Like [`temp_store`], wrapped in a [`FlakyStore`]
pub fn flaky_store() -> (Arc<FlakyStore<RedbKvStore>>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RedbKvStore::create(dir.path().join("flaky.redb")).unwrap();
    (Arc::new(FlakyStore::new(store)), dir)
}

/// Write a compact list that expired a minute ago
pub fn seed_expired<S: KvStore>(store: &S, ns: &IndexNamespace, key: &str, items: &[&str]) {
    let mut txn = store.begin().unwrap();
    legacy::write_legacy_list(
        &mut txn,
        ns,
        &ObjectKey::from(key),
        items.iter().copied(),
        Some(now_millis() - 60_000),
    )
    .unwrap();
    txn.commit().unwrap();
}

/// Write `envelope` at `key` and register it
pub fn seed_envelope<S: KvStore>(
    store: &S,
    ns: &IndexNamespace,
    key: &str,
    envelope: &ObjectEnvelope,
) {
    let mut txn = store.begin().unwrap();
    txn.set(key.as_bytes(), &envelope.encode().unwrap()).unwrap();
    legacy::register(&mut txn, ns, &ObjectKey::from(key)).unwrap();
    txn.commit().unwrap();
}

/// Write raw `bytes` at `key` and register it
pub fn seed_raw<S: KvStore>(store: &S, ns: &IndexNamespace, key: &str, bytes: &[u8]) {
    let mut txn = store.begin().unwrap();
    txn.set(key.as_bytes(), bytes).unwrap();
    legacy::register(&mut txn, ns, &ObjectKey::from(key)).unwrap();
    txn.commit().unwrap();
}

/// A compact list envelope whose body claims `u64::MAX` bytes
pub fn oversized_envelope() -> Vec<u8> {
    let mut bytes = vec![1, 2, 0, 253];
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes
}

pub fn push_all(queue: &MigrationQueue, keys: &[&str]) {
    for key in keys {
        queue.try_push(ObjectKey::from(*key)).unwrap();
    }
}

/// Register index entries without writing any object
pub fn seed_index_only<S: KvStore>(store: &S, ns: &IndexNamespace, keys: &[&str]) {
    let mut txn = store.begin().unwrap();
    for key in keys {
        legacy::register(&mut txn, ns, &ObjectKey::from(*key)).unwrap();
    }
    txn.commit().unwrap();
}

/// Object keys still present in the index, in key order
pub fn indexed_keys<S: KvStore>(store: &S, ns: &IndexNamespace) -> Vec<ObjectKey> {
    let txn = store.begin().unwrap();
    let mut keys = Vec::new();
    txn.scan(&ns.prefix(), &ns.upper_bound(), &mut |index_key, _| {
        keys.push(ObjectKey::from(ns.strip_index_key(index_key)));
        Ok(ControlFlow::Continue(()))
    })
    .unwrap();
    txn.rollback().unwrap();
    keys
}

pub fn is_indexed<S: KvStore>(store: &S, ns: &IndexNamespace, key: &str) -> bool {
    let txn = store.begin().unwrap();
    let registered = legacy::is_registered(&txn, ns, &ObjectKey::from(key)).unwrap();
    txn.rollback().unwrap();
    registered
}

pub fn raw_get<S: KvStore>(store: &S, key: &[u8]) -> Option<Vec<u8>> {
    let txn = store.begin().unwrap();
    let value = txn.get(key).unwrap();
    txn.rollback().unwrap();
    value
}

/// Elements of the linked list at `key`, or `None` if it was not converted
pub fn modern_items<S: KvStore>(store: &S, key: &str) -> Option<Vec<String>> {
    let txn = store.begin().unwrap();
    let items = read_modern_list(&txn, &ObjectKey::from(key)).unwrap();
    txn.rollback().unwrap();
    items.map(|items| {
        items
            .into_iter()
            .map(|item| String::from_utf8(item).unwrap())
            .collect()
    })
}

/// Poll `check` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// Failure budgets shared by a [`FlakyStore`] and its transactions
#[derive(Default)]
struct Faults {
    begins: AtomicUsize,
    scans: AtomicUsize,
    gets: AtomicUsize,
    commits: AtomicUsize,
}

// Consume one unit of `budget`; true if the operation should fail.
fn take(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(op: &str) -> MigrateError {
    MigrateError::Store(format!("injected {} failure", op))
}

/// Store wrapper that fails begins, scans, reads or commits on demand.
///
/// A failed commit rolls the inner transaction back, so nothing it wrote
/// becomes visible.
pub struct FlakyStore<S> {
    inner: S,
    faults: Arc<Faults>,
    commits: Arc<AtomicUsize>,
}

impl<S: KvStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The wrapped store, for checks that must not hit injected faults
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make the next `count` begins fail
    pub fn fail_next_begins(&self, count: usize) {
        self.faults.begins.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` scans fail before visiting any entry
    pub fn fail_next_scans(&self, count: usize) {
        self.faults.scans.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail
    pub fn fail_next_gets(&self, count: usize) {
        self.faults.gets.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` commits fail
    pub fn fail_next_commits(&self, count: usize) {
        self.faults.commits.store(count, Ordering::SeqCst);
    }

    /// Commits that went through
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl<S: KvStore> KvStore for FlakyStore<S> {
    type Txn = FlakyTxn<S::Txn>;

    fn begin(&self) -> MigrateResult<Self::Txn> {
        if take(&self.faults.begins) {
            return Err(injected("begin"));
        }
        Ok(FlakyTxn {
            inner: self.inner.begin()?,
            faults: Arc::clone(&self.faults),
            commits: Arc::clone(&self.commits),
        })
    }
}

pub struct FlakyTxn<T> {
    inner: T,
    faults: Arc<Faults>,
    commits: Arc<AtomicUsize>,
}

impl<T: KvTransaction> KvTransaction for FlakyTxn<T> {
    fn get(&self, key: &[u8]) -> MigrateResult<Option<Vec<u8>>> {
        if take(&self.faults.gets) {
            return Err(injected("get"));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> MigrateResult<()> {
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> MigrateResult<()> {
        self.inner.delete(key)
    }

    fn scan(&self, start: &[u8], end: &[u8], visit: &mut ScanVisitor<'_>) -> MigrateResult<()> {
        if take(&self.faults.scans) {
            return Err(injected("scan"));
        }
        self.inner.scan(start, end, visit)
    }

    fn commit(self) -> MigrateResult<()> {
        if take(&self.faults.commits) {
            self.inner.rollback()?;
            return Err(injected("commit"));
        }
        self.inner.commit()?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(self) -> MigrateResult<()> {
        self.inner.rollback()
    }
}

/// Converter that fails for selected keys after writing part of the new
/// representation, and converts everything else normally.
#[derive(Default)]
pub struct FailingConverter {
    failing: Mutex<HashSet<ObjectKey>>,
}

impl FailingConverter {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            failing: Mutex::new(keys.iter().map(|key| ObjectKey::from(*key)).collect()),
        }
    }

    /// Let `key` convert from now on
    pub fn heal(&self, key: &str) {
        self.failing.lock().unwrap().remove(&ObjectKey::from(key));
    }
}

impl ListConverter for FailingConverter {
    fn convert(&self, txn: &mut dyn KvTransaction, legacy: LegacyList) -> MigrateResult<ModernList> {
        let fails = self.failing.lock().unwrap().contains(legacy.key());
        if fails {
            txn.set(legacy.key().as_bytes(), b"half-written")?;
            return Err(MigrateError::Conversion(format!(
                "injected failure for {}",
                legacy.key()
            )));
        }
        LinkedListConverter.convert(txn, legacy)
    }
}
