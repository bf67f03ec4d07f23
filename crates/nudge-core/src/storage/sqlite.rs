use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{NudgeError, Result};
use crate::model::{
    CreateReminderInput, RecurrencePattern, Reminder, ReminderStatus, SeriesRole,
    validate_create_input,
};
use crate::storage::backend::{ReminderStore, StoreCounts};

/// SQLite-backed reminder store.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>` so it can be shared
/// across async tasks. All blocking SQLite calls go through
/// [`with_conn`](Self::with_conn) which runs them on the Tokio blocking
/// thread-pool. All values travel as bound parameters.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a file-backed SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| NudgeError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            NudgeError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| NudgeError::Storage(format!("failed to set WAL mode: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| NudgeError::Storage(format!("failed to enable foreign keys: {e}")))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        store.create_tables()?;
        Ok(store)
    }

    /// Create the reminders table and its indexes (idempotent).
    ///
    /// The table is append-only: occurrence history is never rewritten,
    /// only status transitions and head counters are updated in place.
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| NudgeError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner INTEGER NOT NULL,
                task TEXT NOT NULL,
                scheduled_at TEXT NOT NULL,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                status TEXT NOT NULL DEFAULT 'pending',
                role TEXT NOT NULL DEFAULT 'one_shot',
                parent_id INTEGER REFERENCES reminders(id),
                pattern TEXT,
                occurrence_count INTEGER NOT NULL DEFAULT 0,
                max_occurrences INTEGER,
                recurrence_end TEXT,
                last_occurrence_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_owner ON reminders(owner);
            CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(status, scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_reminders_parent ON reminders(parent_id);
            ",
        )
        .map_err(|e| NudgeError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| NudgeError::Storage(format!("failed to acquire database lock: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| NudgeError::Storage(format!("task join error: {e}")))?
    }
}

// ── row mapping ────────────────────────────────────────────────────────

fn parse_dt(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let id: i64 = row.get("id")?;
    let scheduled_at = parse_dt(&row.get::<_, String>("scheduled_at")?)?;
    let created_at = parse_dt(&row.get::<_, String>("created_at")?)?;
    let recurrence_end = match row.get::<_, Option<String>>("recurrence_end")? {
        Some(raw) => Some(parse_dt(&raw)?),
        None => None,
    };
    let last_occurrence_at = match row.get::<_, Option<String>>("last_occurrence_at")? {
        Some(raw) => Some(parse_dt(&raw)?),
        None => None,
    };

    let status: ReminderStatus = row
        .get::<_, String>("status")?
        .parse()
        .unwrap_or(ReminderStatus::Inactive);

    let role = match row.get::<_, String>("role")?.as_str() {
        "series_head" => SeriesRole::SeriesHead,
        "occurrence" => match row.get::<_, Option<i64>>("parent_id")? {
            Some(parent) => SeriesRole::Occurrence { parent },
            None => {
                tracing::warn!(id, "occurrence row without parent, treating as one-shot");
                SeriesRole::OneShot
            }
        },
        _ => SeriesRole::OneShot,
    };

    // A corrupt pattern column degrades to None instead of failing the
    // whole listing; such a head spawns no successors.
    let pattern = row
        .get::<_, Option<String>>("pattern")?
        .and_then(|raw| match serde_json::from_str::<RecurrencePattern>(&raw) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(id, error = %e, "malformed recurrence pattern, ignoring");
                None
            }
        });

    Ok(Reminder {
        id,
        owner: row.get("owner")?,
        task: row.get("task")?,
        scheduled_at,
        timezone: row.get("timezone")?,
        status,
        role,
        pattern,
        occurrence_count: row.get("occurrence_count")?,
        max_occurrences: row.get("max_occurrences")?,
        recurrence_end,
        last_occurrence_at,
        created_at,
    })
}

fn role_columns(role: &SeriesRole) -> (&'static str, Option<i64>) {
    match role {
        SeriesRole::OneShot => ("one_shot", None),
        SeriesRole::SeriesHead => ("series_head", None),
        SeriesRole::Occurrence { parent } => ("occurrence", Some(*parent)),
    }
}

const SELECT_COLUMNS: &str = "id, owner, task, scheduled_at, timezone, status, role, parent_id, \
     pattern, occurrence_count, max_occurrences, recurrence_end, last_occurrence_at, created_at";

impl ReminderStore for SqliteStore {
    async fn create(&self, input: &CreateReminderInput) -> Result<i64> {
        validate_create_input(input)?;
        let input = input.clone();
        self.with_conn(move |conn| {
            let (role, parent_id) = role_columns(&input.role);
            let pattern = input
                .pattern
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let changed = conn
                .execute(
                    "INSERT INTO reminders (owner, task, scheduled_at, timezone, status, role, \
                     parent_id, pattern, max_occurrences, recurrence_end, created_at) \
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        input.owner,
                        input.task,
                        input.scheduled_at.to_rfc3339(),
                        input.timezone,
                        role,
                        parent_id,
                        pattern,
                        input.max_occurrences,
                        input.recurrence_end.map(|d| d.to_rfc3339()),
                        Utc::now().to_rfc3339(),
                    ],
                )
                .map_err(|e| NudgeError::Storage(format!("failed to insert reminder: {e}")))?;
            if changed == 0 {
                return Err(NudgeError::Storage(
                    "insert acknowledged no rows".to_string(),
                ));
            }
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Reminder> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM reminders WHERE id = ?1"),
                params![id],
                row_to_reminder,
            )
            .optional()
            .map_err(|e| NudgeError::Storage(format!("failed to fetch reminder: {e}")))?
            .ok_or_else(|| NudgeError::NotFound(format!("reminder {id}")))
        })
        .await
    }

    async fn list_active(&self, owner: i64) -> Result<Vec<Reminder>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM reminders \
                     WHERE owner = ?1 AND status != 'inactive' \
                     ORDER BY scheduled_at ASC"
                ))
                .map_err(|e| NudgeError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![owner], row_to_reminder)
                .map_err(|e| NudgeError::Storage(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| NudgeError::Storage(format!("failed to list reminders: {e}")))?;
            Ok(rows)
        })
        .await
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM reminders \
                     WHERE status = 'pending' AND scheduled_at <= ?1 \
                     ORDER BY scheduled_at ASC"
                ))
                .map_err(|e| NudgeError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![now.to_rfc3339()], row_to_reminder)
                .map_err(|e| NudgeError::Storage(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| NudgeError::Storage(format!("failed to list due reminders: {e}")))?;
            Ok(rows)
        })
        .await
    }

    async fn mark_sent(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE reminders SET status = 'sent' \
                     WHERE id = ?1 AND status IN ('pending', 'sent')",
                    params![id],
                )
                .map_err(|e| NudgeError::Storage(format!("failed to mark sent: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    async fn deactivate(&self, id: i64, owner: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE reminders SET status = 'inactive' \
                     WHERE id = ?1 AND owner = ?2 AND status != 'inactive'",
                    params![id, owner],
                )
                .map_err(|e| NudgeError::Storage(format!("failed to deactivate: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    async fn stop_series(&self, head_id: i64, owner: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE reminders SET status = 'inactive' \
                     WHERE owner = ?2 AND status = 'pending' \
                     AND (id = ?1 OR parent_id = ?1)",
                    params![head_id, owner],
                )
                .map_err(|e| NudgeError::Storage(format!("failed to stop series: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    async fn record_spawn(&self, head_id: i64, fired_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE reminders SET occurrence_count = occurrence_count + 1, \
                 last_occurrence_at = ?2 WHERE id = ?1",
                params![head_id, fired_at.to_rfc3339()],
            )
            .map_err(|e| NudgeError::Storage(format!("failed to record spawn: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn counts(&self) -> Result<StoreCounts> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM reminders GROUP BY status")
                .map_err(|e| NudgeError::Storage(e.to_string()))?;
            let mut counts = StoreCounts::default();
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })
                .map_err(|e| NudgeError::Storage(e.to_string()))?;
            for row in rows {
                let (status, n) =
                    row.map_err(|e| NudgeError::Storage(format!("failed to count rows: {e}")))?;
                match status.as_str() {
                    "pending" => counts.pending = n,
                    "sent" => counts.sent = n,
                    "inactive" => counts.inactive = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
    }
}
