//! Migration metrics.
//!
//! Workers report once per committed batch. [`PrometheusMetrics`] exposes the
//! totals as `list_migration_total{kind="object"}`,
//! `list_migration_total{kind="element"}` and
//! `list_migration_total{kind="stale"}`.

use crate::error::MigrateResult;
use prometheus::{IntCounterVec, Opts, Registry};

pub const METRIC_NAME: &str = "list_migration_total";

/// Counts of one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Lists converted
    pub objects: u64,
    /// Elements moved by those conversions
    pub elements: u64,
    /// Stale index entries removed
    pub stale: u64,
}

/// Sink for committed batch statistics.
pub trait MigrationMetrics: Send + Sync + 'static {
    fn record_batch(&self, stats: &BatchStats);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MigrationMetrics for NoopMetrics {
    fn record_batch(&self, _stats: &BatchStats) {}
}

/// Prometheus counters for migration progress.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    migrated: IntCounterVec,
}

impl PrometheusMetrics {
    /// Create the counters and register them in `registry`.
    pub fn register(registry: &Registry) -> MigrateResult<Self> {
        let migrated = IntCounterVec::new(
            Opts::new(METRIC_NAME, "Legacy list objects and elements migrated"),
            &["kind"],
        )?;
        registry.register(Box::new(migrated.clone()))?;
        Ok(Self { migrated })
    }

    pub fn objects(&self) -> u64 {
        self.migrated.with_label_values(&["object"]).get()
    }

    pub fn elements(&self) -> u64 {
        self.migrated.with_label_values(&["element"]).get()
    }

    pub fn stale(&self) -> u64 {
        self.migrated.with_label_values(&["stale"]).get()
    }
}

impl MigrationMetrics for PrometheusMetrics {
    fn record_batch(&self, stats: &BatchStats) {
        self.migrated.with_label_values(&["object"]).inc_by(stats.objects);
        self.migrated.with_label_values(&["element"]).inc_by(stats.elements);
        self.migrated.with_label_values(&["stale"]).inc_by(stats.stale);
    }
}
