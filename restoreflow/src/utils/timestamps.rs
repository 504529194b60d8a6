//! Timestamp helpers.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Milliseconds elapsed since `start`.
#[must_use]
pub fn elapsed_ms(start: &Timestamp) -> i64 {
    (now_utc() - *start).num_milliseconds()
}
