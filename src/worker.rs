//! Migration workers.
//!
//! Each worker pulls object keys from the queue and migrates them inside a
//! transaction it keeps open across several keys, committing once
//! `batch_count` steps succeeded or as soon as the queue runs dry. Any failure
//! rolls back the whole batch; the affected keys keep their index entries and
//! come back through a later scan pass.
//!
//! A worker is always in one of two states:
//!
//! * idle: no transaction is open and nothing is pending;
//! * accumulating: a transaction is open with `0 < pending < batch_count`.
//!
//! Commits and rollbacks always return the worker to idle.

use crate::backend::{KvStore, KvTransaction};
use crate::config::MigrationConfig;
use crate::convert::ListConverter;
use crate::error::{MigrateError, MigrateResult};
use crate::keys::{IndexNamespace, ObjectKey};
use crate::legacy::{self, Loaded, StaleReason};
use crate::metrics::{BatchStats, MigrationMetrics};
use crate::queue::MigrationQueue;
use log::{debug, error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a single successful migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// The list was rewritten; `elements` elements moved
    Converted { elements: u64 },
    /// The index entry was stale and has been removed
    Stale(StaleReason),
}

impl MigrationStep {
    pub fn elements(&self) -> u64 {
        match self {
            MigrationStep::Converted { elements } => *elements,
            MigrationStep::Stale(_) => 0,
        }
    }
}

/// Migrate the object at `key` inside `txn`, without committing.
///
/// On success the index entry of `key` has been deleted in `txn`. On error the
/// caller must roll `txn` back.
pub fn migrate_one<T, C>(
    txn: &mut T,
    namespace: &IndexNamespace,
    converter: &C,
    key: &ObjectKey,
) -> MigrateResult<MigrationStep>
where
    T: KvTransaction,
    C: ListConverter + ?Sized,
{
    let list = match legacy::load(txn, key) {
        Ok(Loaded::Legacy(list)) => list,
        Ok(Loaded::Stale(reason)) => {
            if let Err(err) = legacy::unregister(txn, namespace, key) {
                error!("Worker: error removing index entry of {}: {}", key, err);
                return Err(err);
            }
            debug!("Worker: removed stale index entry of {} ({})", key, reason);
            return Ok(MigrationStep::Stale(reason));
        }
        Err(err) => {
            error!("Worker: error loading compact list {}: {}", key, err);
            return Err(err);
        }
    };

    let modern = converter.convert(txn, list).map_err(|err| {
        error!("Worker: error converting compact list {}: {}", key, err);
        err
    })?;

    if let Err(err) = legacy::unregister(txn, namespace, key) {
        error!("Worker: error removing index entry of {}: {}", key, err);
        return Err(err);
    }
    Ok(MigrationStep::Converted {
        elements: modern.len,
    })
}

// `pending` counts every successful step, stale removals included.
struct Batch<T> {
    txn: T,
    pending: usize,
    stats: BatchStats,
}

struct Worker<S: KvStore, C, M> {
    id: usize,
    store: Arc<S>,
    converter: Arc<C>,
    metrics: Arc<M>,
    queue: MigrationQueue,
    namespace: IndexNamespace,
    batch_count: usize,
    interval: Duration,
    shutdown: CancellationToken,
    batch: Option<Batch<S::Txn>>,
}

impl<S, C, M> Worker<S, C, M>
where
    S: KvStore,
    C: ListConverter,
    M: MigrationMetrics,
{
    fn run(mut self) {
        info!("Worker[{}]: started", self.id);
        loop {
            if self.shutdown.is_cancelled() {
                self.commit_pending();
                break;
            }
            match self.queue.try_pop() {
                Some(key) => self.process(key),
                None if self.batch.is_some() => self.commit_pending(),
                None => {
                    if let Some(key) = self.queue.pop_timeout(self.interval) {
                        self.process(key);
                    }
                }
            }
        }
        info!("Worker[{}]: stopped", self.id);
    }

    fn process(&mut self, key: ObjectKey) {
        let mut batch = match self.batch.take() {
            Some(batch) => batch,
            None => match self.store.begin() {
                Ok(txn) => Batch {
                    txn,
                    pending: 0,
                    stats: BatchStats::default(),
                },
                Err(err) => {
                    error!("Worker[{}]: error beginning transaction: {}", self.id, err);
                    return;
                }
            },
        };

        match migrate_one(&mut batch.txn, &self.namespace, self.converter.as_ref(), &key) {
            Ok(step) => {
                batch.pending += 1;
                match step {
                    MigrationStep::Converted { elements } => {
                        batch.stats.objects += 1;
                        batch.stats.elements += elements;
                    }
                    MigrationStep::Stale(_) => batch.stats.stale += 1,
                }
            }
            Err(err) => {
                error!(
                    "Worker[{}]: migration of {} failed, rolling back {} pending: {}",
                    self.id, key, batch.pending, err
                );
                if let Err(err) = batch.txn.rollback() {
                    error!("Worker[{}]: rollback failed: {}", self.id, err);
                }
                return;
            }
        }

        if batch.pending >= self.batch_count {
            self.commit(batch);
        } else {
            self.batch = Some(batch);
        }
    }

    fn commit_pending(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.commit(batch);
        }
    }

    fn commit(&self, batch: Batch<S::Txn>) {
        let Batch {
            txn,
            pending,
            stats,
        } = batch;
        match txn.commit() {
            Ok(()) => {
                self.metrics.record_batch(&stats);
                debug!(
                    "Worker[{}]: migrated {} compact lists, {} elements, {} stale",
                    self.id, stats.objects, stats.elements, stats.stale
                );
            }
            Err(err) => {
                error!(
                    "Worker[{}]: error committing batch of {}: {}",
                    self.id, pending, err
                );
            }
        }
    }
}

/// Fixed set of worker threads sharing one queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Start `config.workers` threads.
    ///
    /// Workers stop when `shutdown` (or the pool's own token, see
    /// [`WorkerPool::shutdown`]) is cancelled, committing any open batch first.
    pub fn spawn<S, C, M>(
        store: Arc<S>,
        converter: Arc<C>,
        metrics: Arc<M>,
        queue: MigrationQueue,
        config: &MigrationConfig,
        shutdown: &CancellationToken,
    ) -> MigrateResult<Self>
    where
        S: KvStore,
        C: ListConverter,
        M: MigrationMetrics,
    {
        let shutdown = shutdown.child_token();
        let mut handles = Vec::with_capacity(config.workers);

        for id in 0..config.workers {
            let store = Arc::clone(&store);
            let converter = Arc::clone(&converter);
            let metrics = Arc::clone(&metrics);
            let queue = queue.clone();
            let namespace = config.namespace.clone();
            let token = shutdown.clone();
            let batch_count = config.batch_count;
            let interval = config.interval;

            let spawned = thread::Builder::new()
                .name(format!("list-migrator-{}", id))
                .spawn(move || {
                    Worker {
                        id,
                        store,
                        converter,
                        metrics,
                        queue,
                        namespace,
                        batch_count,
                        interval,
                        shutdown: token,
                        batch: None,
                    }
                    .run()
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    shutdown.cancel();
                    return Err(err.into());
                }
            }
        }

        Ok(Self { handles, shutdown })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Token observed by every worker of this pool.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Stop all workers and wait for them to exit.
    pub fn shutdown(self) -> MigrateResult<()> {
        self.shutdown.cancel();
        let mut panicked = false;
        for handle in self.handles {
            panicked |= handle.join().is_err();
        }
        if panicked {
            return Err(MigrateError::WorkerPanicked);
        }
        Ok(())
    }
}
