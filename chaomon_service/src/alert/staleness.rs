/// Log record staleness detection.
///
/// The sources publish roughly hourly and the pollers run on cron. When a
/// source goes quiet the logs fill with placeholder lines and the last good
/// record ages silently; the daily summary uses this module to say so
/// instead of presenting an old figure as current.
///
/// # Clock injection
/// All functions accept `now` rather than reading the clock, so staleness is
/// deterministic in tests.

use chrono::{DateTime, Duration, FixedOffset};

/// Returns `true` if `observed_at` is older than `max_age` relative to `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age  →  stale
///   age == max_age →  not stale
///
/// A timestamp in the future is not stale.
pub fn is_stale_at(observed_at: DateTime<FixedOffset>, max_age: Duration, now: DateTime<FixedOffset>) -> bool {
    now.signed_duration_since(observed_at) > max_age
}

/// Whole hours between `observed_at` and `now`, never negative.
pub fn age_hours(observed_at: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> i64 {
    now.signed_duration_since(observed_at).num_hours().max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
