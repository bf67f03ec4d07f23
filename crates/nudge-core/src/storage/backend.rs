use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{CreateReminderInput, Reminder};

/// Per-status row counts, for the admin status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub pending: u64,
    pub sent: u64,
    pub inactive: u64,
}

/// Abstract reminder store. SQLite is the shipped implementation; the
/// trait exists so the processor can run against a fake in tests.
///
/// Every operation is a single atomic unit of work. `mark_sent` is the
/// idempotency point the processor relies on across cycles.
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder row, returning its generated id.
    fn create(
        &self,
        input: &CreateReminderInput,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    fn get(&self, id: i64) -> impl std::future::Future<Output = Result<Reminder>> + Send;

    /// Non-inactive reminders for `owner`, scheduled ascending.
    fn list_active(
        &self,
        owner: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Reminder>>> + Send;

    /// Pending reminders with `scheduled_at <= now`, most overdue first.
    fn list_due(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Reminder>>> + Send;

    /// Transition a row to `Sent`. Idempotent: a second call on an
    /// already-sent row succeeds without effect. Returns `false` for
    /// missing or inactive rows.
    fn mark_sent(&self, id: i64) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Soft-delete one row. Scoped to `owner`: a matching id owned by a
    /// different user is left untouched and reported as `false`.
    fn deactivate(
        &self,
        id: i64,
        owner: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Stop a recurring series: deactivate the head and every unsent
    /// occurrence linked to it, scoped to `owner`. Sent rows stay as
    /// history.
    fn stop_series(
        &self,
        head_id: i64,
        owner: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Record one firing of a series: bump the head's occurrence count
    /// and last-occurrence instant.
    fn record_spawn(
        &self,
        head_id: i64,
        fired_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn counts(&self) -> impl std::future::Future<Output = Result<StoreCounts>> + Send;
}
