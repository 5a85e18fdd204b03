//! Index scanner.
//!
//! One pass walks the index namespace in key order from a cursor and feeds the
//! object keys it finds into the migration queue. A pass ends early, without
//! losing anything, when the queue is full or the pass deadline has passed;
//! the returned cursor then points at the first index key that was *not*
//! enqueued. When the namespace is exhausted the cursor wraps back to the
//! namespace start, so the scan sweeps the index continuously.

use crate::backend::{KvStore, KvTransaction};
use crate::error::MigrateResult;
use crate::keys::{Cursor, IndexNamespace, ObjectKey};
use crate::queue::MigrationQueue;
use log::{debug, error};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use strum::Display;

/// Why a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PassStop {
    /// No index entries left; the cursor wrapped to the namespace start
    Exhausted,
    QueueFull,
    Deadline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub next_cursor: Cursor,
    pub enqueued: usize,
    pub stop: PassStop,
}

/// Producer side of the pipeline. Only one scanner may run at a time; the
/// caller guarantees that through leadership.
pub struct Scanner<S> {
    store: Arc<S>,
    queue: MigrationQueue,
    namespace: IndexNamespace,
}

impl<S> Clone for Scanner<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            queue: self.queue.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S: KvStore> Scanner<S> {
    pub fn new(store: Arc<S>, queue: MigrationQueue, namespace: IndexNamespace) -> Self {
        Self {
            store,
            queue,
            namespace,
        }
    }

    pub fn namespace(&self) -> &IndexNamespace {
        &self.namespace
    }

    /// Run one pass starting at `cursor`, giving up once `deadline` is reached.
    pub fn run_pass(&self, cursor: &Cursor, deadline: Instant) -> MigrateResult<PassReport> {
        let txn = self.store.begin()?;
        let prefix = self.namespace.prefix();
        let end = self.namespace.upper_bound();

        let mut enqueued = 0;
        let mut stopped: Option<(Cursor, PassStop)> = None;
        let scanned = txn.scan(cursor.as_bytes(), &end, &mut |index_key, _| {
            if !index_key.starts_with(&prefix) {
                return Ok(ControlFlow::Break(()));
            }
            if Instant::now() >= deadline {
                stopped = Some((Cursor::at(index_key), PassStop::Deadline));
                return Ok(ControlFlow::Break(()));
            }
            let object_key = ObjectKey::from(self.namespace.strip_index_key(index_key));
            match self.queue.try_push(object_key) {
                Ok(()) => {
                    enqueued += 1;
                    Ok(ControlFlow::Continue(()))
                }
                Err(_) => {
                    stopped = Some((Cursor::at(index_key), PassStop::QueueFull));
                    Ok(ControlFlow::Break(()))
                }
            }
        });

        if let Err(err) = scanned {
            error!("Scanner: error iterating index from {:?}: {}", cursor, err);
            discard(txn);
            return Err(err);
        }

        match stopped {
            Some((next_cursor, stop)) => {
                discard(txn);
                Ok(PassReport {
                    next_cursor,
                    enqueued,
                    stop,
                })
            }
            None => {
                debug!(
                    "Scanner: no more index entries after {} keys, restarting from namespace start",
                    enqueued
                );
                txn.commit()?;
                Ok(PassReport {
                    next_cursor: self.namespace.lower_bound(),
                    enqueued,
                    stop: PassStop::Exhausted,
                })
            }
        }
    }
}

// The pass never writes, so a failed rollback loses nothing.
fn discard<T: KvTransaction>(txn: T) {
    if let Err(err) = txn.rollback() {
        error!("Scanner: rollback failed: {}", err);
    }
}
