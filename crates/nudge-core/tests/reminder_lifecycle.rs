//! End-to-end flow: free text in, scheduled row out, fired on time,
//! recurring series advanced without duplication.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use nudge_core::error::Result;
use nudge_core::model::{CreateReminderInput, ReminderStatus, SeriesRole};
use nudge_core::parse::{ParseOutcome, PhraseParser};
use nudge_core::processor::{Delivery, DueProcessor};
use nudge_core::storage::{ReminderStore, SqliteStore};

struct RecordingDelivery {
    sent: Mutex<Vec<String>>,
}

impl Delivery for RecordingDelivery {
    async fn send(&self, _owner: i64, text: &str) -> Result<bool> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(true)
    }
}

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 11, 10, 0, 0).unwrap()
}

fn create_input(owner: i64, tz: &str, parsed: nudge_core::parse::ParsedReminder) -> CreateReminderInput {
    let mut input = CreateReminderInput::new(owner, parsed.task, parsed.scheduled_at, tz.to_string());
    if let Some(pattern) = parsed.pattern {
        input = input.with_pattern(pattern);
    }
    input
}

#[tokio::test]
async fn one_shot_reminder_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let parser = PhraseParser::default();

    let parsed = parser
        .parse(
            "/remind me to call mom tomorrow at 7pm",
            "America/New_York".parse().unwrap(),
            reference(),
        )
        .ok()
        .expect("phrase should parse");

    let id = store
        .create(&create_input(42, "America/New_York", parsed))
        .await
        .unwrap();

    // Round trip through the active listing.
    let active = store.list_active(42).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
    assert_eq!(active[0].task, "call mom");
    assert_eq!(active[0].timezone, "America/New_York");
    // 7pm eastern daylight time is 23:00 UTC.
    assert_eq!(
        active[0].scheduled_at,
        Utc.with_ymd_and_hms(2025, 6, 12, 23, 0, 0).unwrap()
    );

    // Not due yet.
    let processor = DueProcessor::new(store, RecordingDelivery { sent: Mutex::new(Vec::new()) });
    let early = processor.process_due(reference()).await;
    assert_eq!(early.sent, 0);

    // Due once the instant passes.
    let later = processor
        .process_due(reference() + Duration::days(2))
        .await;
    assert_eq!(later.sent, 1);
    assert_eq!(later.recurring_created, 0);

    let fired = processor.store().get(id).await.unwrap();
    assert_eq!(fired.status, ReminderStatus::Sent);
}

#[tokio::test]
async fn recurring_series_survives_multiple_cycles() {
    let store = SqliteStore::open_in_memory().unwrap();
    let parser = PhraseParser::default();

    let parsed = parser
        .parse("drink water every 3 hours", chrono_tz::UTC, reference())
        .ok()
        .expect("recurring phrase should parse");
    assert_eq!(parsed.scheduled_at, reference());

    let head = store.create(&create_input(7, "UTC", parsed)).await.unwrap();

    let processor = DueProcessor::new(store, RecordingDelivery { sent: Mutex::new(Vec::new()) });

    // Cycle 1: head fires, first occurrence spawns at +3h.
    let c1 = processor.process_due(reference()).await;
    assert_eq!((c1.sent, c1.recurring_created), (1, 1));

    // Re-running the same cycle immediately does nothing: the head is
    // already sent and the successor is not yet due.
    let again = processor.process_due(reference()).await;
    assert_eq!(again.sent, 0);

    // Cycle 2, three hours later: the occurrence fires and spawns the next.
    let c2 = processor.process_due(reference() + Duration::hours(3)).await;
    assert_eq!((c2.sent, c2.recurring_created), (1, 1));

    let head_row = processor.store().get(head).await.unwrap();
    assert_eq!(head_row.occurrence_count, 2);
    assert_eq!(head_row.role, SeriesRole::SeriesHead);

    // Exactly one pending row remains, scheduled at +6h. No duplicates.
    let active = processor.store().list_active(7).await.unwrap();
    let pending: Vec<_> = active
        .iter()
        .filter(|r| r.status == ReminderStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].scheduled_at, reference() + Duration::hours(6));
}

#[tokio::test]
async fn stopping_a_series_silences_it() {
    let store = SqliteStore::open_in_memory().unwrap();
    let parser = PhraseParser::default();

    let parsed = parser
        .parse("stretch every hour", chrono_tz::UTC, reference())
        .ok()
        .unwrap();
    let head = store.create(&create_input(7, "UTC", parsed)).await.unwrap();

    let processor = DueProcessor::new(store, RecordingDelivery { sent: Mutex::new(Vec::new()) });
    processor.process_due(reference()).await;

    assert!(processor.store().stop_series(head, 7).await.unwrap());

    // The spawned occurrence never fires.
    let after = processor
        .process_due(reference() + Duration::hours(2))
        .await;
    assert_eq!(after.sent, 0);

    // Fired history is still visible.
    let active = processor.store().list_active(7).await.unwrap();
    assert!(active.iter().any(|r| r.status == ReminderStatus::Sent));
}

#[tokio::test]
async fn unparseable_text_creates_nothing() {
    let parser = PhraseParser::default();
    assert!(matches!(
        parser.parse("remind me to do the thing", chrono_tz::UTC, reference()),
        ParseOutcome::NoTime
    ));
    assert!(matches!(
        parser.parse("follow up 5 days ago", chrono_tz::UTC, reference()),
        ParseOutcome::NoTime
    ));
}
