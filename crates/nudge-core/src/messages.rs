//! User-facing message templates.
//!
//! The catalog is injected wherever replies are produced, keyed by dotted
//! paths ("reminder.created"). A missing key renders as the key itself and
//! logs a warning, so a thin or broken table never breaks a reply path.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{NudgeError, Result};

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut templates = HashMap::new();
        for (key, template) in [
            ("reminder.created", "Got it! I'll remind you to {task} on {when}."),
            (
                "reminder.created_recurring",
                "Got it! I'll remind you to {task} {pattern}, starting {when}.",
            ),
            (
                "reminder.clarify",
                "I couldn't find a time in that. Try something like \"remind me to call mom tomorrow at 7pm\".",
            ),
            (
                "reminder.past_date",
                "That time has already passed. Give me a time in the future.",
            ),
            ("reminder.error", "Something went wrong, please try again."),
            ("reminder.notify", "Reminder: {task} (scheduled for {when})"),
            ("reminder.stopped", "Stopped the recurring reminder."),
            ("reminder.deleted", "Reminder deleted."),
            ("reminder.not_found", "I couldn't find that reminder."),
            ("reminder.list_empty", "You have no upcoming reminders."),
        ] {
            templates.insert(key.to_string(), template.to_string());
        }
        Self { templates }
    }
}

impl MessageCatalog {
    /// Load a catalog from a flat TOML table of `key = "template"` pairs.
    /// Keys absent from the file fall back to the built-in defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let overrides: HashMap<String, String> =
            toml::from_str(raw).map_err(|e| NudgeError::Config(format!("bad message table: {e}")))?;
        let mut catalog = Self::default();
        catalog.templates.extend(overrides);
        Ok(catalog)
    }

    /// Render `key`, substituting `{name}` placeholders. Unknown keys echo
    /// the key back so the caller always has something to send.
    pub fn render(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.templates.get(key) else {
            tracing::warn!(key, "missing message template");
            return key.to_string();
        };
        let mut out = template.clone();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}

/// Serde helper so a catalog path can appear in config files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageTableConfig {
    /// Optional path to a TOML file of template overrides.
    pub path: Option<String>,
}
