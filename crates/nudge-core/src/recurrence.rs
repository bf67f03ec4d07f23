//! Recurrence progression. Pure calendar arithmetic, no I/O, no "now".

use chrono::{DateTime, Days, Duration, Months, Utc};

use crate::model::{RecurrencePattern, RecurrenceUnit, Reminder};

/// Compute the next occurrence after `anchor` for `pattern`.
///
/// Minutes and hours are fixed durations. Days and weeks are calendar days,
/// and months use calendar-month arithmetic: the year rolls forward past
/// December and the day-of-month clamps to the target month's length
/// (Jan 31 + 1 month = Feb 28/29). Deterministic for a given input pair.
///
/// Returns `None` only when the result would overflow chrono's range.
pub fn next_occurrence(
    anchor: DateTime<Utc>,
    pattern: &RecurrencePattern,
) -> Option<DateTime<Utc>> {
    let value = i64::from(pattern.value);
    match pattern.unit {
        RecurrenceUnit::Minutes => anchor.checked_add_signed(Duration::minutes(value)),
        RecurrenceUnit::Hours => anchor.checked_add_signed(Duration::hours(value)),
        RecurrenceUnit::Days => anchor.checked_add_days(Days::new(u64::from(pattern.value))),
        RecurrenceUnit::Weeks => {
            anchor.checked_add_days(Days::new(u64::from(pattern.value) * 7))
        }
        RecurrenceUnit::Months => anchor.checked_add_months(Months::new(pattern.value)),
    }
}

/// Whether a series head's termination bounds allow one more occurrence at
/// `next`. Both bounds must be satisfied; the count bound assumes the
/// current firing is about to be recorded.
pub fn series_bounds_permit(head: &Reminder, next: DateTime<Utc>) -> bool {
    if let Some(max) = head.max_occurrences {
        if head.occurrence_count + 1 >= max {
            return false;
        }
    }
    if let Some(end) = head.recurrence_end {
        if next > end {
            return false;
        }
    }
    true
}
