//! Due-reminder processing: dispatch, bookkeeping, series advancement.
//!
//! One entry point, [`DueProcessor::process_due`], invoked on a fixed
//! cadence by an external scheduler. Cross-cycle coordination is carried
//! entirely by the store's status column: a row marked sent or inactive in
//! a prior cycle simply never shows up in the next due set.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{NudgeError, Result};
use crate::messages::MessageCatalog;
use crate::model::{CreateReminderInput, Reminder, ReminderStatus, SeriesRole};
use crate::recurrence::{next_occurrence, series_bounds_permit};
use crate::storage::ReminderStore;

/// Notification delivery collaborator. `Ok(false)` means the transport
/// refused the message; the reminder stays due and is retried next cycle.
pub trait Delivery: Send + Sync {
    fn send(
        &self,
        owner: i64,
        text: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Outcome of one processing cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub sent: usize,
    pub failed: usize,
    pub recurring_created: usize,
}

pub struct DueProcessor<S, D> {
    store: S,
    delivery: D,
    messages: MessageCatalog,
}

impl<S: ReminderStore, D: Delivery> DueProcessor<S, D> {
    pub fn new(store: S, delivery: D) -> Self {
        Self {
            store,
            delivery,
            messages: MessageCatalog::default(),
        }
    }

    pub fn with_catalog(mut self, messages: MessageCatalog) -> Self {
        self.messages = messages;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every reminder due at `now`, most overdue first.
    ///
    /// Strictly sequential: each dispatch and each store mutation completes
    /// before the next reminder is touched. A failure on one reminder is
    /// counted and logged, never propagated to the rest of the batch.
    pub async fn process_due(&self, now: DateTime<Utc>) -> ProcessSummary {
        let mut summary = ProcessSummary::default();

        let due = match self.store.list_due(now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch due reminders");
                return summary;
            }
        };

        for reminder in due {
            match self.process_one(&reminder, now).await {
                Ok(spawned) => {
                    summary.sent += 1;
                    if spawned {
                        summary.recurring_created += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        id = reminder.id,
                        owner = reminder.owner,
                        error = %e,
                        "reminder left due for retry"
                    );
                }
            }
        }

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            recurring_created = summary.recurring_created,
            "processing cycle complete"
        );
        summary
    }

    /// Dispatch one reminder and, if it belongs to a recurring series,
    /// materialize the next occurrence. Returns whether a successor row
    /// was created.
    async fn process_one(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<bool> {
        let text = self.format_notification(reminder);
        let delivered = self.delivery.send(reminder.owner, &text).await?;
        if !delivered {
            return Err(NudgeError::Delivery(format!(
                "dispatch refused for reminder {}",
                reminder.id
            )));
        }

        // Mark sent before any series bookkeeping: if the process dies
        // between these steps the row must not fire a second time, even at
        // the cost of a missed successor.
        if !self.store.mark_sent(reminder.id).await? {
            tracing::warn!(id = reminder.id, "row vanished before it could be marked sent");
            return Ok(false);
        }

        self.spawn_successor(reminder, now).await
    }

    async fn spawn_successor(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<bool> {
        let Some(head_id) = reminder.role.head_id(reminder.id) else {
            return Ok(false);
        };

        let head = if head_id == reminder.id {
            reminder.clone()
        } else {
            self.store.get(head_id).await?
        };

        // A stopped head ends the series even if an occurrence fired late.
        if head.status == ReminderStatus::Inactive {
            return Ok(false);
        }

        let Some(pattern) = head.pattern else {
            if head.role == SeriesRole::SeriesHead {
                tracing::warn!(head = head.id, "series head has no usable pattern, not spawning");
            }
            return Ok(false);
        };

        // Anchor at the fired occurrence's scheduled instant, not "now",
        // so the series does not drift when processing runs late.
        let Some(next) = next_occurrence(reminder.scheduled_at, &pattern) else {
            tracing::warn!(head = head.id, "next occurrence out of range, series halts");
            return Ok(false);
        };

        if !series_bounds_permit(&head, next) {
            tracing::debug!(head = head.id, "series bounds reached, not spawning");
            return Ok(false);
        }

        let successor = CreateReminderInput::new(
            head.owner,
            head.task.clone(),
            next,
            head.timezone.clone(),
        )
        .with_parent(head.id);

        self.store.create(&successor).await?;
        self.store.record_spawn(head.id, now).await?;
        Ok(true)
    }

    fn format_notification(&self, reminder: &Reminder) -> String {
        let when = format_in_zone(reminder.scheduled_at, &reminder.timezone);
        self.messages.render(
            "reminder.notify",
            &[("task", &reminder.task), ("when", &when)],
        )
    }
}

/// Format an instant in the given IANA zone for human display, falling
/// back to UTC when the zone name does not parse.
pub fn format_in_zone(instant: DateTime<Utc>, zone: &str) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => instant
            .with_timezone(&tz)
            .format("%a %b %-d, %Y at %-I:%M %p %Z")
            .to_string(),
        Err(_) => {
            tracing::warn!(zone, "unknown timezone, formatting in UTC");
            instant.format("%a %b %-d, %Y at %H:%M UTC").to_string()
        }
    }
}
