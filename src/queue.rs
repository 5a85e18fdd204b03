//! Bounded queue of object keys between the scanner and the workers.
//!
//! The queue is an owned value: the scanner gets one clone and every worker
//! gets another. Pushing never blocks; a full queue is reported to the caller.

use crate::keys::ObjectKey;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Result of a non-blocking push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The queue is at capacity; the key was not enqueued
    Full(ObjectKey),
    /// Every consumer handle has been dropped
    Closed(ObjectKey),
}

/// Multi-producer, multi-consumer bounded FIFO.
#[derive(Debug, Clone)]
pub struct MigrationQueue {
    tx: Sender<ObjectKey>,
    rx: Receiver<ObjectKey>,
    capacity: usize,
}

impl MigrationQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn try_push(&self, key: ObjectKey) -> Result<(), PushError> {
        self.tx.try_send(key).map_err(|err| match err {
            TrySendError::Full(key) => PushError::Full(key),
            TrySendError::Disconnected(key) => PushError::Closed(key),
        })
    }

    /// Take a key if one is immediately available.
    pub fn try_pop(&self) -> Option<ObjectKey> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a key.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<ObjectKey> {
        match self.rx.recv_timeout(timeout) {
            Ok(key) => Some(key),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
