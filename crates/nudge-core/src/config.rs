use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{NudgeError, Result};
use crate::messages::MessageTableConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NudgeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default, skip_serializing)]
    pub messages: MessageTableConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom path for the SQLite database. Defaults to `~/.config/nudge/nudge.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-reminder processing ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// IANA zone used when an owner has no stored preference.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Chat identifier allowed to view the status report.
    #[serde(default)]
    pub admin_id: Option<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            admin_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Task text used when extraction leaves an empty string.
    #[serde(default = "default_fallback_task")]
    pub fallback_task: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fallback_task: default_fallback_task(),
        }
    }
}

// -- Defaults --

fn default_interval_secs() -> u64 {
    60
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_fallback_task() -> String {
    crate::model::FALLBACK_TASK.to_string()
}

/// Minimum scheduler interval; anything shorter is clamped.
pub const MIN_INTERVAL_SECS: u64 = 10;

impl NudgeConfig {
    /// Load configuration with a two-layer TOML merge:
    /// 1. `~/.config/nudge/config.toml` (global)
    /// 2. `.nudge/config.toml` (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".nudge").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| NudgeError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| NudgeError::Config(e.to_string()))?;

        for warning in cfg.validate() {
            tracing::warn!("{warning}");
        }
        Ok(cfg)
    }

    /// Validate config values, clamping out-of-range values and returning
    /// warnings. Lenient: fixes values rather than rejecting the config.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.scheduler.interval_secs < MIN_INTERVAL_SECS {
            warnings.push(format!(
                "scheduler.interval_secs = {} too low, clamping to {MIN_INTERVAL_SECS}",
                self.scheduler.interval_secs
            ));
            self.scheduler.interval_secs = MIN_INTERVAL_SECS;
        }

        if self.bot.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            warnings.push(format!(
                "bot.default_timezone '{}' is not a known IANA zone, falling back to UTC",
                self.bot.default_timezone
            ));
            self.bot.default_timezone = "UTC".to_string();
        }

        if self.parser.fallback_task.trim().is_empty() {
            warnings.push("parser.fallback_task is empty, using the default".to_string());
            self.parser.fallback_task = default_fallback_task();
        }

        warnings
    }

    /// The configured default zone, already validated.
    pub fn default_tz(&self) -> chrono_tz::Tz {
        self.bot
            .default_timezone
            .parse()
            .unwrap_or(chrono_tz::UTC)
    }
}

/// Global config path: `~/.config/nudge/config.toml`
fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nudge").join("config.toml"))
}
