//! Recurrence for scheduled broadcasts

use chrono::{DateTime, Duration, Utc};

use crate::db::Frequency;

/// Fixed repeat interval, or `None` for one-shot tasks
///
/// A `custom` frequency without a positive interval is one-shot.
#[must_use]
pub fn interval(frequency: Frequency, custom_minutes: Option<i64>) -> Option<Duration> {
    match frequency {
        Frequency::Once => None,
        Frequency::Daily => Some(Duration::days(1)),
        Frequency::Weekly => Some(Duration::weeks(1)),
        Frequency::Custom => custom_minutes
            .filter(|m| *m > 0)
            .and_then(Duration::try_minutes),
    }
}

/// Next slot strictly after `now`, stepping from the previous slot
///
/// Missed windows are skipped rather than replayed.
#[must_use]
pub fn next_occurrence(
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
    interval: Duration,
) -> DateTime<Utc> {
    let mut next = previous + interval;
    if next > now {
        return next;
    }

    // Jump over whole missed periods instead of looping one at a time
    let step = interval.num_milliseconds();
    if step > 0 {
        let missed = (now - next).num_milliseconds() / step;
        if let Ok(missed) = i32::try_from(missed) {
            next += interval * missed;
        }
    }
    while next <= now {
        next += interval;
    }
    next
}
