use chrono::{TimeZone, Utc};

use crate::model::*;

fn input() -> CreateReminderInput {
    CreateReminderInput::new(
        42,
        "Call mom".to_string(),
        Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap(),
        "America/New_York".to_string(),
    )
}

#[test]
fn test_create_input_defaults() {
    let input = input();
    assert_eq!(input.role, SeriesRole::OneShot);
    assert!(input.pattern.is_none());
    assert!(input.max_occurrences.is_none());
    assert!(input.recurrence_end.is_none());
}

#[test]
fn test_with_pattern_promotes_to_series_head() {
    let input = input().with_pattern(RecurrencePattern {
        value: 3,
        unit: RecurrenceUnit::Hours,
    });
    assert_eq!(input.role, SeriesRole::SeriesHead);
    assert_eq!(input.pattern.unwrap().value, 3);
}

#[test]
fn test_with_parent_links_occurrence() {
    let input = input().with_parent(7);
    assert_eq!(input.role, SeriesRole::Occurrence { parent: 7 });
}

#[test]
fn test_validate_rejects_empty_task() {
    let mut input = input();
    input.task = "   ".to_string();
    assert!(validate_create_input(&input).is_err());
}

#[test]
fn test_validate_rejects_overlong_task() {
    let mut input = input();
    input.task = "x".repeat(MAX_TASK_LENGTH + 1);
    assert!(validate_create_input(&input).is_err());
}

#[test]
fn test_validate_rejects_zero_recurrence_value() {
    let input = input().with_pattern(RecurrencePattern {
        value: 0,
        unit: RecurrenceUnit::Days,
    });
    assert!(validate_create_input(&input).is_err());
}

#[test]
fn test_validate_rejects_head_without_pattern() {
    let mut input = input();
    input.role = SeriesRole::SeriesHead;
    assert!(validate_create_input(&input).is_err());
}

#[test]
fn test_validate_accepts_plain_input() {
    assert!(validate_create_input(&input()).is_ok());
}

#[test]
fn test_unit_from_str_accepts_singular_and_plural() {
    assert_eq!("hour".parse::<RecurrenceUnit>(), Ok(RecurrenceUnit::Hours));
    assert_eq!("hours".parse::<RecurrenceUnit>(), Ok(RecurrenceUnit::Hours));
    assert_eq!("Week".parse::<RecurrenceUnit>(), Ok(RecurrenceUnit::Weeks));
    assert!("fortnight".parse::<RecurrenceUnit>().is_err());
}

#[test]
fn test_pattern_display() {
    let every_day = RecurrencePattern {
        value: 1,
        unit: RecurrenceUnit::Days,
    };
    assert_eq!(every_day.to_string(), "every day");

    let every_3h = RecurrencePattern {
        value: 3,
        unit: RecurrenceUnit::Hours,
    };
    assert_eq!(every_3h.to_string(), "every 3 hours");
}

#[test]
fn test_head_id() {
    assert_eq!(SeriesRole::OneShot.head_id(5), None);
    assert_eq!(SeriesRole::SeriesHead.head_id(5), Some(5));
    assert_eq!(SeriesRole::Occurrence { parent: 3 }.head_id(5), Some(3));
}

#[test]
fn test_confidence_ordering() {
    assert!(Confidence::Low < Confidence::Medium);
    assert!(Confidence::Medium < Confidence::High);
}

#[test]
fn test_status_round_trips_through_str() {
    for status in [
        ReminderStatus::Pending,
        ReminderStatus::Sent,
        ReminderStatus::Inactive,
    ] {
        assert_eq!(status.to_string().parse::<ReminderStatus>(), Ok(status));
    }
}
