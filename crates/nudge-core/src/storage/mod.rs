mod backend;
mod sqlite;

pub use backend::{ReminderStore, StoreCounts};
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::config::NudgeConfig;
use crate::error::{NudgeError, Result};

/// Open the reminder store described by the configuration.
pub fn create_store(config: &NudgeConfig) -> Result<SqliteStore> {
    let path = match &config.storage.path {
        Some(p) => PathBuf::from(p),
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| NudgeError::Storage(format!("failed to create data directory: {e}")))?;
    }
    SqliteStore::open(&path)
}

/// Default SQLite path: `~/.config/nudge/nudge.db`
fn default_db_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("nudge").join("nudge.db"))
        .ok_or_else(|| NudgeError::Config("cannot determine config directory".to_string()))
}
