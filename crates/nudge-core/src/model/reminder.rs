use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NudgeError, Result};

pub const MAX_TASK_LENGTH: usize = 500;

/// Task text used when extraction leaves nothing behind.
pub const FALLBACK_TASK: &str = "Reminder";

/// Validate inputs for creating a new reminder.
pub fn validate_create_input(input: &CreateReminderInput) -> Result<()> {
    let trimmed = input.task.trim();
    if trimmed.is_empty() {
        return Err(NudgeError::InvalidInput("task cannot be empty".into()));
    }
    if trimmed.len() > MAX_TASK_LENGTH {
        return Err(NudgeError::InvalidInput(format!(
            "task exceeds maximum length of {MAX_TASK_LENGTH} characters"
        )));
    }
    if let Some(ref pattern) = input.pattern {
        if pattern.value == 0 {
            return Err(NudgeError::InvalidInput(
                "recurrence value must be positive".into(),
            ));
        }
    }
    if matches!(input.role, SeriesRole::SeriesHead) && input.pattern.is_none() {
        return Err(NudgeError::InvalidInput(
            "a series head requires a recurrence pattern".into(),
        ));
    }
    if let Some(max) = input.max_occurrences {
        if max == 0 {
            return Err(NudgeError::InvalidInput(
                "max_occurrences must be positive".into(),
            ));
        }
    }
    Ok(())
}

/// The central entity: one individually-firable scheduled reminder row.
///
/// Rows are append-only. A recurring series is a head row plus occurrence
/// rows spawned one at a time as the series fires; `scheduled_at` is never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    /// Owning chat-user identifier. Referenced, not owned.
    pub owner: i64,
    pub task: String,
    /// Absolute UTC instant at which this occurrence is due.
    pub scheduled_at: DateTime<Utc>,
    /// IANA zone the owner was in at parse time. Display-only.
    pub timezone: String,
    pub status: ReminderStatus,
    pub role: SeriesRole,
    /// Recurrence pattern; present on series heads. `None` on heads whose
    /// stored pattern failed to decode — such heads spawn no successors.
    pub pattern: Option<RecurrencePattern>,
    /// How many times this series has fired and spawned. Monotonic.
    pub occurrence_count: u32,
    pub max_occurrences: Option<u32>,
    pub recurrence_end: Option<DateTime<Utc>>,
    pub last_occurrence_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Human-readable recurrence label for listings. Falls back to a
    /// generic marker when the stored pattern was malformed.
    pub fn recurrence_label(&self) -> Option<String> {
        match self.role {
            SeriesRole::OneShot => None,
            SeriesRole::Occurrence { .. } => None,
            SeriesRole::SeriesHead => Some(match &self.pattern {
                Some(p) => p.to_string(),
                None => "recurring".to_string(),
            }),
        }
    }
}

/// Lifecycle state of a reminder row.
///
/// `Pending` is eligible to fire; `Sent` has fired and is kept as history;
/// `Inactive` is soft-deleted or stopped and never fires or recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Sent,
    Inactive,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("unknown reminder status: {s}")),
        }
    }
}

/// Position of a row within a recurring series, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SeriesRole {
    /// A plain, non-recurring reminder.
    OneShot,
    /// First row of a recurring series; holds the pattern and counters.
    SeriesHead,
    /// A materialized occurrence spawned from a series head.
    Occurrence { parent: i64 },
}

impl SeriesRole {
    /// Id of the series head this row belongs to, given its own id.
    pub fn head_id(&self, own_id: i64) -> Option<i64> {
        match self {
            Self::OneShot => None,
            Self::SeriesHead => Some(own_id),
            Self::Occurrence { parent } => Some(*parent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl std::fmt::Display for RecurrenceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes => write!(f, "minutes"),
            Self::Hours => write!(f, "hours"),
            Self::Days => write!(f, "days"),
            Self::Weeks => write!(f, "weeks"),
            Self::Months => write!(f, "months"),
        }
    }
}

impl std::str::FromStr for RecurrenceUnit {
    type Err = String;

    /// Accepts singular or plural; normalizes to the plural form.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "minute" => Ok(Self::Minutes),
            "hour" => Ok(Self::Hours),
            "day" => Ok(Self::Days),
            "week" => Ok(Self::Weeks),
            "month" => Ok(Self::Months),
            _ => Err(format!("unknown recurrence unit: {s}")),
        }
    }
}

/// "every `value` `unit`" — e.g. `{3, hours}` for "every 3 hours".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub value: u32,
    pub unit: RecurrenceUnit,
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value == 1 {
            write!(f, "every {}", self.unit.to_string().trim_end_matches('s'))
        } else {
            write!(f, "every {} {}", self.value, self.unit)
        }
    }
}

/// How precisely the parser believes it identified the intended instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Input for creating a new reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderInput {
    pub owner: i64,
    pub task: String,
    pub scheduled_at: DateTime<Utc>,
    pub timezone: String,
    #[serde(default = "default_role")]
    pub role: SeriesRole,
    #[serde(default)]
    pub pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    #[serde(default)]
    pub recurrence_end: Option<DateTime<Utc>>,
}

fn default_role() -> SeriesRole {
    SeriesRole::OneShot
}

impl CreateReminderInput {
    pub fn new(owner: i64, task: String, scheduled_at: DateTime<Utc>, timezone: String) -> Self {
        Self {
            owner,
            task,
            scheduled_at,
            timezone,
            role: SeriesRole::OneShot,
            pattern: None,
            max_occurrences: None,
            recurrence_end: None,
        }
    }

    /// Mark this row as a series head with the given pattern.
    pub fn with_pattern(mut self, pattern: RecurrencePattern) -> Self {
        self.role = SeriesRole::SeriesHead;
        self.pattern = Some(pattern);
        self
    }

    /// Link this row to a series head as a spawned occurrence.
    pub fn with_parent(mut self, parent: i64) -> Self {
        self.role = SeriesRole::Occurrence { parent };
        self
    }

    pub fn with_max_occurrences(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    pub fn with_end_date(mut self, end: DateTime<Utc>) -> Self {
        self.recurrence_end = Some(end);
        self
    }
}
