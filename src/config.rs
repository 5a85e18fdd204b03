//! Configuration for the migration engine.
//!
//! [`MigrationConfig`] can be built in code through the `typed-builder`
//! generated builder or loaded from a TOML document:
//!
//! ```
//! use list_migrator::config::MigrationConfig;
//! use std::time::Duration;
//!
//! let config = MigrationConfig::builder()
//!     .workers(2)
//!     .batch_count(16)
//!     .interval(Duration::from_millis(250))
//!     .build();
//! assert_eq!(config.queue_depth, 100);
//!
//! let config = MigrationConfig::from_toml_str(
//!     r#"
//!     queue_depth = 10
//!     workers = 1
//!     batch_count = 2
//!     interval_ms = 50
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.interval, Duration::from_millis(50));
//! ```

use crate::error::{MigrateError, MigrateResult};
use crate::keys::IndexNamespace;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_QUEUE_DEPTH: usize = 100;
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_BATCH_COUNT: usize = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Tuning knobs for the scanner and the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
#[serde(default)]
#[builder(doc)]
pub struct MigrationConfig {
    /// Capacity of the migration queue
    #[builder(default = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Number of worker threads
    #[builder(default = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Successful migrations per commit
    #[builder(default = DEFAULT_BATCH_COUNT)]
    pub batch_count: usize,

    /// Scan tick period and worker idle sleep
    #[serde(rename = "interval_ms", with = "duration_millis")]
    #[builder(default = DEFAULT_INTERVAL)]
    pub interval: Duration,

    /// Where index entries live
    #[builder(default)]
    pub namespace: IndexNamespace,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            workers: DEFAULT_WORKERS,
            batch_count: DEFAULT_BATCH_COUNT,
            interval: DEFAULT_INTERVAL,
            namespace: IndexNamespace::default(),
        }
    }
}

impl MigrationConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> MigrateResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> MigrateResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Every count and the interval must be strictly positive.
    pub fn validate(&self) -> MigrateResult<()> {
        let checks = [
            ("queue_depth", self.queue_depth),
            ("workers", self.workers),
            ("batch_count", self.batch_count),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(MigrateError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.interval.is_zero() {
            return Err(MigrateError::Configuration(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
