//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use list_migrator::prelude::*;
//! ```

// Error handling
pub use crate::error::{MigrateError, MigrateResult};

// Backend types
pub use crate::backend::{KvStore, KvTransaction};
#[cfg(feature = "redb")]
pub use crate::backend::RedbKvStore;

// Engine
pub use crate::config::MigrationConfig;
pub use crate::convert::{LinkedListConverter, ListConverter, ModernList};
pub use crate::keys::{Cursor, IndexNamespace, ObjectKey};
pub use crate::legacy::{LegacyList, Loaded, StaleReason};
pub use crate::lifecycle::MigrationTask;
pub use crate::metrics::{MigrationMetrics, NoopMetrics, PrometheusMetrics};
pub use crate::queue::MigrationQueue;
pub use crate::scanner::{PassReport, PassStop, Scanner};
pub use crate::worker::{MigrationStep, WorkerPool};
