//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Age of `then` relative to `now` in whole seconds.
///
/// Negative when `then` lies in the future (clock skew between issuers).
pub fn age_seconds(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_seconds()
}

/// Whole seconds elapsed between two ticks, rounded to nearest and never below one.
pub fn elapsed_tick_seconds(previous: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (now - previous).num_milliseconds();
    if millis <= 0 {
        return 1;
    }
    let rounded = (millis + 500) / 1000;
    rounded.clamp(1, u32::MAX as i64) as u32
}

/// Convert a millisecond epoch value back into a UTC timestamp
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}
