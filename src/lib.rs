//! # List Migrator
//!
//! Background migration of list objects stored with the deprecated compact
//! encoding into the linked list encoding, inside a transactional key-value
//! store.
//!
//! Writers of compact lists register an index entry next to each object. The
//! engine sweeps that index and converts every listed object in place:
//!
//! - **Scanner**: one instance, run while the process holds leadership, walks
//!   the index in key order from a saved cursor and pushes object keys into a
//!   bounded queue.
//! - **Workers**: a fixed pool of threads that migrate queued keys in batched
//!   transactions. Converting an object and deleting its index entry always
//!   commit together; a failed batch is rolled back and picked up again by a
//!   later pass.
//! - **Index entries** are the only retry state: an entry disappears exactly
//!   when its object has been converted or found stale.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use list_migrator::prelude::*;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> MigrateResult<()> {
//! let store = Arc::new(RedbKvStore::create("data.redb")?);
//! let config = MigrationConfig::builder().workers(2).build();
//!
//! let leadership = CancellationToken::new();
//! let shutdown = CancellationToken::new();
//! let mut task = MigrationTask::start(
//!     store,
//!     Arc::new(LinkedListConverter),
//!     Arc::new(NoopMetrics),
//!     config,
//!     &shutdown,
//! )?;
//! task.lead(&leadership).await;
//! task.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod keys;
pub mod legacy;
pub mod lifecycle;
pub mod metrics;
pub mod object;
pub mod prelude;
pub mod queue;
pub mod scanner;
pub mod utils;
pub mod worker;

pub use error::{MigrateError, MigrateResult};
