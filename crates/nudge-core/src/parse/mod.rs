//! Free-text reminder parsing.
//!
//! Turns "remind me to call mom tomorrow at 7pm" into a task, a UTC
//! instant, an optional recurrence pattern, and a confidence label.

pub mod pattern;
pub mod resolver;

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::model::{Confidence, RecurrencePattern, FALLBACK_TASK};

pub use pattern::{find_pattern, parse_pattern};
pub use resolver::{DateResolver, FieldFlags, ResolvedTime, RuleResolver};

/// Command prefix: "/remind me to", "remind me", "remind to", with any
/// casing and irregular internal whitespace.
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*/?\s*remind(?:\s+me)?(?:\s+to)?\s+").unwrap());

/// Successful parse of a reminder phrase.
#[derive(Debug, Clone)]
pub struct ParsedReminder {
    pub task: String,
    pub scheduled_at: DateTime<Utc>,
    pub confidence: Confidence,
    pub pattern: Option<RecurrencePattern>,
}

impl ParsedReminder {
    pub fn is_recurring(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Outcome of parsing a phrase. The two failure modes are distinct so the
/// caller can word its reply differently: `NoTime` asks for a time,
/// `PastDate` asks for a future one.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(ParsedReminder),
    /// A time expression was found but it is not after the reference
    /// instant, and the phrase is not recurring. A one-shot reminder in
    /// the past could never fire under the "due <= now" rule.
    PastDate,
    /// No time expression at all.
    NoTime,
}

impl ParseOutcome {
    pub fn ok(self) -> Option<ParsedReminder> {
        match self {
            Self::Parsed(parsed) => Some(parsed),
            Self::PastDate | Self::NoTime => None,
        }
    }
}

/// Phrase parser over an injected date resolver.
pub struct PhraseParser<R: DateResolver> {
    resolver: R,
    fallback_task: String,
}

impl Default for PhraseParser<RuleResolver> {
    fn default() -> Self {
        Self::new(RuleResolver)
    }
}

impl<R: DateResolver> PhraseParser<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            fallback_task: FALLBACK_TASK.to_string(),
        }
    }

    pub fn with_fallback_task(mut self, task: impl Into<String>) -> Self {
        self.fallback_task = task.into();
        self
    }

    /// Parse a raw user phrase anchored at `reference` in `tz`.
    pub fn parse(&self, text: &str, tz: Tz, reference: DateTime<Utc>) -> ParseOutcome {
        let cleaned = strip_prefix(text);

        // Recurrence first: its phrase must not reach the date resolver,
        // so "every 3 hours" doesn't read as a clock time.
        let (recurrence, stripped) = match pattern::find_pattern(cleaned) {
            Some((pat, span)) => (Some(pat), remove_spans(cleaned, vec![span])),
            None => (None, cleaned.to_string()),
        };

        let best = self
            .resolver
            .resolve(&stripped, reference, tz)
            .into_iter()
            .next();

        let (scheduled_at, flags, time_spans) = match best {
            Some(resolved) => (resolved.instant, resolved.explicit, resolved.spans),
            None if recurrence.is_some() => {
                // Recurring with no explicit time anchors at "now".
                (reference, FieldFlags::default(), Vec::new())
            }
            None => return ParseOutcome::NoTime,
        };

        if recurrence.is_none() && scheduled_at <= reference {
            return ParseOutcome::PastDate;
        }

        let mut task = remove_spans(&stripped, time_spans);
        task = tidy_task(&task);
        if task.is_empty() {
            task = self.fallback_task.clone();
        }

        let confidence = derive_confidence(flags, recurrence.is_some());

        ParseOutcome::Parsed(ParsedReminder {
            task,
            scheduled_at,
            confidence,
            pattern: recurrence,
        })
    }
}

/// High needs an explicit clock down to the minute; an explicit calendar
/// date without a clock is Medium; anything vaguer is Low. Recurring
/// phrases never report High.
fn derive_confidence(flags: FieldFlags, recurring: bool) -> Confidence {
    let base = if flags.hour && flags.minute {
        Confidence::High
    } else if flags.day && flags.month {
        Confidence::Medium
    } else {
        Confidence::Low
    };
    if recurring {
        base.min(Confidence::Medium)
    } else {
        base
    }
}

fn strip_prefix(text: &str) -> &str {
    match PREFIX_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text.trim(),
    }
}

/// Excise byte spans from `text`, collapsing the surrounding whitespace.
fn remove_spans(text: &str, mut spans: Vec<Range<usize>>) -> String {
    spans.sort_by_key(|s| s.start);
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for span in spans {
        if span.start > pos {
            out.push_str(&text[pos..span.start]);
            out.push(' ');
        }
        pos = pos.max(span.end);
    }
    if pos < text.len() {
        out.push_str(&text[pos..]);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tidy_task(task: &str) -> String {
    task.trim()
        .trim_matches(|c: char| c == ',' || c == '.' || c == ';' || c == ':')
        .trim()
        .to_string()
}
