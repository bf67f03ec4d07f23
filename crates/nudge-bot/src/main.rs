use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use nudge_core::config::NudgeConfig;
use nudge_core::error::Result as CoreResult;
use nudge_core::messages::MessageCatalog;
use nudge_core::model::CreateReminderInput;
use nudge_core::parse::{ParseOutcome, PhraseParser};
use nudge_core::processor::{format_in_zone, Delivery, DueProcessor};
use nudge_core::storage::{create_store, ReminderStore};

#[derive(Parser)]
#[command(name = "nudge", about = "nudge: natural-language reminders for your chat", version)]
enum Cli {
    /// Create a reminder from a natural-language phrase
    Add {
        /// The phrase, e.g. "call mom tomorrow at 7pm" or "drink water every 3 hours"
        text: String,
        /// Owning chat-user id
        #[arg(long, default_value_t = 0)]
        user: i64,
        /// IANA timezone for interpreting the phrase (defaults from config)
        #[arg(long)]
        tz: Option<String>,
    },
    /// List upcoming and fired reminders
    List {
        #[arg(long, default_value_t = 0)]
        user: i64,
        /// Output raw JSON instead of lines
        #[arg(long)]
        json: bool,
    },
    /// Delete one reminder
    Delete {
        id: i64,
        #[arg(long, default_value_t = 0)]
        user: i64,
    },
    /// Stop a recurring series (fired history is kept)
    Stop {
        id: i64,
        #[arg(long, default_value_t = 0)]
        user: i64,
    },
    /// Show store counts (admin only)
    Status {
        #[arg(long, default_value_t = 0)]
        user: i64,
    },
    /// Run the due-reminder scheduler loop
    Run {
        /// Seconds between processing ticks (defaults from config)
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Delivery collaborator that prints to the console. Stands in for a chat
/// transport binding.
struct ConsoleDelivery;

impl Delivery for ConsoleDelivery {
    async fn send(&self, owner: i64, text: &str) -> CoreResult<bool> {
        println!("{} {}", format!("[user {owner}]").dimmed(), text.bold());
        Ok(true)
    }
}

fn load_catalog(config: &NudgeConfig) -> Result<MessageCatalog> {
    match &config.messages.path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read message table {path}"))?;
            Ok(MessageCatalog::from_toml_str(&raw)?)
        }
        None => Ok(MessageCatalog::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = NudgeConfig::load(Some(Path::new("."))).context("failed to load configuration")?;
    let catalog = load_catalog(&config)?;
    let store = create_store(&config).context("failed to open reminder store")?;

    match cli {
        Cli::Add { text, user, tz } => {
            let zone_name = tz.unwrap_or_else(|| config.bot.default_timezone.clone());
            let zone: Tz = zone_name
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown timezone: {zone_name}"))?;
            let parser =
                PhraseParser::default().with_fallback_task(config.parser.fallback_task.clone());

            match parser.parse(&text, zone, Utc::now()) {
                ParseOutcome::NoTime => {
                    println!("{}", catalog.render("reminder.clarify", &[]));
                }
                ParseOutcome::PastDate => {
                    println!("{}", catalog.render("reminder.past_date", &[]));
                }
                ParseOutcome::Parsed(parsed) => {
                    let when = format_in_zone(parsed.scheduled_at, &zone_name);
                    let mut input = CreateReminderInput::new(
                        user,
                        parsed.task.clone(),
                        parsed.scheduled_at,
                        zone_name.clone(),
                    );
                    let reply = match &parsed.pattern {
                        Some(pattern) => {
                            input = input.with_pattern(*pattern);
                            catalog.render(
                                "reminder.created_recurring",
                                &[
                                    ("task", &parsed.task),
                                    ("pattern", &pattern.to_string()),
                                    ("when", &when),
                                ],
                            )
                        }
                        None => catalog.render(
                            "reminder.created",
                            &[("task", &parsed.task), ("when", &when)],
                        ),
                    };

                    match store.create(&input).await {
                        Ok(id) => {
                            println!("{reply}");
                            println!(
                                "{}",
                                format!("(#{id}, confidence: {})", parsed.confidence).dimmed()
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to persist reminder");
                            println!("{}", catalog.render("reminder.error", &[]));
                        }
                    }
                }
            }
        }

        Cli::List { user, json } => {
            let reminders = store.list_active(user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            } else if reminders.is_empty() {
                println!("{}", catalog.render("reminder.list_empty", &[]));
            } else {
                for r in reminders {
                    let when = format_in_zone(r.scheduled_at, &r.timezone);
                    let recurrence = r
                        .recurrence_label()
                        .map(|label| format!(" ({label})"))
                        .unwrap_or_default();
                    println!(
                        "{:>5}  {}  {}{}  [{}]",
                        format!("#{}", r.id).cyan(),
                        when,
                        r.task.bold(),
                        recurrence,
                        r.status
                    );
                }
            }
        }

        Cli::Delete { id, user } => {
            let key = if store.deactivate(id, user).await? {
                "reminder.deleted"
            } else {
                "reminder.not_found"
            };
            println!("{}", catalog.render(key, &[]));
        }

        Cli::Stop { id, user } => {
            let key = if store.stop_series(id, user).await? {
                "reminder.stopped"
            } else {
                "reminder.not_found"
            };
            println!("{}", catalog.render(key, &[]));
        }

        Cli::Status { user } => {
            if config.bot.admin_id != Some(user) {
                println!("Status is only available to the configured admin.");
            } else {
                let counts = store.counts().await?;
                println!(
                    "pending: {}  sent: {}  inactive: {}",
                    counts.pending.green(),
                    counts.sent,
                    counts.inactive.dimmed()
                );
            }
        }

        Cli::Run { interval } => {
            let secs = interval.unwrap_or(config.scheduler.interval_secs).max(1);
            let processor = DueProcessor::new(store, ConsoleDelivery).with_catalog(catalog);
            tracing::info!(interval_secs = secs, "scheduler loop starting");

            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(secs));
            loop {
                ticker.tick().await;
                let summary = processor.process_due(Utc::now()).await;
                if summary.sent + summary.failed > 0 {
                    tracing::info!(
                        sent = summary.sent,
                        failed = summary.failed,
                        recurring_created = summary.recurring_created,
                        "tick"
                    );
                }
            }
        }
    }

    Ok(())
}
