//! Lifecycle of the migration engine.
//!
//! [`MigrationTask::start`] allocates the queue and starts the worker pool,
//! which then runs until process shutdown. [`MigrationTask::lead`] drives the
//! scanner on a fixed tick for as long as the caller holds leadership and can
//! be called again for every new leadership term; the scan resumes from the
//! cursor the previous term stopped at.

use crate::backend::KvStore;
use crate::config::MigrationConfig;
use crate::convert::{LinkedListConverter, ListConverter};
use crate::error::MigrateResult;
use crate::keys::Cursor;
use crate::metrics::{MigrationMetrics, NoopMetrics};
use crate::queue::MigrationQueue;
use crate::scanner::{PassReport, Scanner};
use crate::worker::WorkerPool;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct MigrationTask<S: KvStore> {
    scanner: Scanner<S>,
    queue: MigrationQueue,
    workers: WorkerPool,
    interval: Duration,
    cursor: Cursor,
}

impl<S: KvStore> MigrationTask<S> {
    /// Validate `config`, allocate the queue and start the workers.
    pub fn start<C, M>(
        store: Arc<S>,
        converter: Arc<C>,
        metrics: Arc<M>,
        config: MigrationConfig,
        shutdown: &CancellationToken,
    ) -> MigrateResult<Self>
    where
        C: ListConverter,
        M: MigrationMetrics,
    {
        config.validate()?;
        let queue = MigrationQueue::new(config.queue_depth);
        let workers = WorkerPool::spawn(
            Arc::clone(&store),
            converter,
            metrics,
            queue.clone(),
            &config,
            shutdown,
        )?;
        info!(
            "ListMigrator: started {} workers, queue depth {}, batch {}, interval {:?}",
            config.workers, config.queue_depth, config.batch_count, config.interval
        );

        let scanner = Scanner::new(store, queue.clone(), config.namespace);
        Ok(Self {
            cursor: scanner.namespace().lower_bound(),
            scanner,
            queue,
            workers,
            interval: config.interval,
        })
    }

    /// Scan the index on every tick until `leadership` is cancelled.
    ///
    /// A failed pass is logged and retried from the same cursor on the next
    /// tick. Workers are left running when leadership is lost.
    pub async fn lead(&mut self, leadership: &CancellationToken) {
        info!("ListMigrator: leading index scan from {:?}", self.cursor);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = leadership.cancelled() => {
                    info!("ListMigrator: leadership lost, index scan stopped at {:?}", self.cursor);
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.scan_once().await {
                Ok(report) => debug!(
                    "ListMigrator: pass enqueued {} keys, stopped on {}",
                    report.enqueued, report.stop
                ),
                Err(err) => error!(
                    "ListMigrator: error in index scan from {:?}: {}",
                    self.cursor, err
                ),
            }
        }
    }

    /// Run a single scanner pass from the current cursor.
    ///
    /// The cursor advances only if the pass succeeds.
    pub async fn scan_once(&mut self) -> MigrateResult<PassReport> {
        let scanner = self.scanner.clone();
        let cursor = self.cursor.clone();
        let deadline = Instant::now() + self.interval;
        let report =
            tokio::task::spawn_blocking(move || scanner.run_pass(&cursor, deadline)).await??;
        self.cursor = report.next_cursor.clone();
        Ok(report)
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn queue(&self) -> &MigrationQueue {
        &self.queue
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// Stop the workers, letting each commit its open batch.
    pub fn shutdown(self) -> MigrateResult<()> {
        info!("ListMigrator: shutting down {} workers", self.workers.len());
        self.workers.shutdown()
    }
}

/// Start the engine with the default converter and no metrics, then scan until
/// `leadership` is lost.
///
/// The returned task still owns running workers; call
/// [`MigrationTask::lead`] again on re-election or
/// [`MigrationTask::shutdown`] to stop them.
pub async fn start<S: KvStore>(
    store: Arc<S>,
    config: MigrationConfig,
    leadership: &CancellationToken,
    shutdown: &CancellationToken,
) -> MigrateResult<MigrationTask<S>> {
    let mut task = MigrationTask::start(
        store,
        Arc::new(LinkedListConverter),
        Arc::new(NoopMetrics),
        config,
        shutdown,
    )?;
    task.lead(leadership).await;
    Ok(task)
}
