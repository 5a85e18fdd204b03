//! Error types for list migration.
//!
//! Every fallible operation in this crate returns [`MigrateResult<T>`], an alias
//! for `Result<T, MigrateError>`. Errors from `redb` and `bincode` convert into
//! [`MigrateError`] through `From`, so the `?` operator can be used directly on
//! backend calls.
//!
//! A stale index entry is *not* an error: the loader reports it as
//! [`Loaded::Stale`](crate::legacy::Loaded::Stale) and the worker resolves it by
//! deleting the index key.
//!
//! ```
//! use list_migrator::error::{MigrateError, MigrateResult};
//!
//! fn check_batch(batch: usize) -> MigrateResult<()> {
//!     if batch == 0 {
//!         return Err(MigrateError::Configuration("batch_count must be > 0".into()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_batch(0).is_err());
//! ```

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// The main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Wraps errors from the redb database
    #[cfg(feature = "redb")]
    #[error(transparent)]
    RedbError(#[from] RedbError),

    /// Wraps deserialization errors from bincode
    #[error(transparent)]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Wraps serialization errors from bincode
    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The converter refused or failed to rewrite a legacy object
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// A stored object is internally inconsistent
    #[error("Corrupt object: {0}")]
    CorruptObject(String),

    /// Errors reported by a non-redb store implementation
    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),

    /// Metric registration failed
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    /// A blocking scan pass could not be joined
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("Worker thread panicked")]
    WorkerPanicked,
}

/// Errors that can occur when interacting with the redb database.
#[cfg(feature = "redb")]
#[derive(Error, Debug)]
pub enum RedbError {
    #[error(transparent)]
    DatabaseError(#[from] redb::DatabaseError),

    #[error(transparent)]
    TransactionError(#[from] redb::TransactionError),

    #[error(transparent)]
    TableError(#[from] redb::TableError),

    #[error(transparent)]
    CommitError(#[from] redb::CommitError),

    #[error(transparent)]
    StorageError(#[from] redb::StorageError),
}

#[cfg(feature = "redb")]
macro_rules! impl_from_redb {
    ($($err:ty => $variant:ident),*) => {
        $(
            impl From<$err> for MigrateError {
                fn from(err: $err) -> Self {
                    MigrateError::RedbError(RedbError::$variant(err))
                }
            }
        )*
    };
}

#[cfg(feature = "redb")]
impl_from_redb!(
    redb::DatabaseError => DatabaseError,
    redb::TransactionError => TransactionError,
    redb::TableError => TableError,
    redb::CommitError => CommitError,
    redb::StorageError => StorageError
);
