//! Fixed-interval schedule aligned to a time of day

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Next run slot strictly after `now`.
///
/// Slots fall at `anchor + k * interval_hours` for every integer `k`,
/// counted from the anchor on `now`'s UTC date. With the default 6 hours
/// anchored at 00:00 that is 00:00, 06:00, 12:00 and 18:00.
pub fn next_run_after(now: DateTime<Utc>, interval_hours: u32, anchor: NaiveTime) -> DateTime<Utc> {
    let interval = Duration::hours(i64::from(interval_hours.max(1)));
    let origin = now.date_naive().and_time(anchor).and_utc();

    let since = now - origin;
    let steps = since.num_seconds().div_euclid(interval.num_seconds()) + 1;
    origin + interval * steps as i32
}

/// Time left until the next slot, for sleeping
pub fn until_next_run(now: DateTime<Utc>, interval_hours: u32, anchor: NaiveTime) -> std::time::Duration {
    (next_run_after(now, interval_hours, anchor) - now)
        .to_std()
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "schedule_test.rs"]
mod tests;
