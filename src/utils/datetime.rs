//! Wall-clock helpers for object expiry.
//!
//! Expiry timestamps are stored as Unix milliseconds in the object envelope.

use chrono::{DateTime, Utc};

/// Type alias for the timestamps used by this crate.
pub type MigrationDateTime = DateTime<Utc>;

/// Current wall time in Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// True if `expire_at` is set and strictly before `now`.
pub fn is_expired(expire_at: Option<i64>, now: i64) -> bool {
    matches!(expire_at, Some(at) if at < now)
}

/// Convert a stored expiry into a datetime, for logging.
pub fn expiry_datetime(expire_at: i64) -> Option<MigrationDateTime> {
    DateTime::<Utc>::from_timestamp_millis(expire_at)
}
