/// Minute-granularity time helpers
///
/// Due dates are stored and compared at minute granularity: seconds and
/// sub-second components are always zero. The reminder scheduler relies on
/// this to match tasks by exact timestamp equality rather than by range.

use chrono::{DateTime, Duration, Timelike, Utc};

/// Offsets (in minutes) ahead of the current minute that the reminder
/// scheduler checks on every tick.
pub const DUE_SOON_OFFSETS_MINUTES: [i64; 2] = [5, 10];

/// Truncates a timestamp to the minute by zeroing seconds and nanoseconds.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use taskdeck_shared::time::truncate_to_minute;
///
/// let dt = Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 42).unwrap();
/// let truncated = truncate_to_minute(dt);
/// assert_eq!(truncated, Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap());
/// ```
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    // with_second/with_nanosecond only fail for out-of-range values; 0 is always valid
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Computes the exact due-soon timestamps for a scheduler tick.
///
/// Given the current time, returns the truncated `now + 5min` and
/// `now + 10min` instants that due dates are matched against.
pub fn due_soon_instants(now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let base = truncate_to_minute(now);
    DUE_SOON_OFFSETS_MINUTES
        .iter()
        .map(|m| base + Duration::minutes(*m))
        .collect()
}
