//! Utility modules for list_migrator.

pub mod datetime;

pub use datetime::{MigrationDateTime, is_expired, now_millis};
