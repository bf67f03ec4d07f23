//! Recurrence-phrase grammar: "every 3 hours", "every week", "daily".

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{RecurrencePattern, RecurrenceUnit};

static EVERY_N_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bevery\s+(\d+)\s+(minute|hour|day|week|month)s?\b").unwrap()
});

static EVERY_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bevery\s+(minute|hour|day|week|month)\b").unwrap());

static FREQUENCY_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(hourly|daily|weekly|monthly)\b").unwrap());

/// Extract a recurrence pattern and the byte span it matched.
///
/// Grammars in precedence order, first match wins:
/// 1. `every <n> <unit>(s)`
/// 2. `every <unit>` (implied value 1)
/// 3. bare frequency words (`hourly`, `daily`, `weekly`, `monthly`)
pub fn find_pattern(text: &str) -> Option<(RecurrencePattern, Range<usize>)> {
    if let Some(caps) = EVERY_N_UNIT_RE.captures(text) {
        let whole = caps.get(0)?;
        let value: u32 = caps.get(1)?.as_str().parse().ok()?;
        if value == 0 {
            return None;
        }
        let unit: RecurrenceUnit = caps.get(2)?.as_str().parse().ok()?;
        return Some((RecurrencePattern { value, unit }, whole.range()));
    }

    if let Some(caps) = EVERY_UNIT_RE.captures(text) {
        let whole = caps.get(0)?;
        let unit: RecurrenceUnit = caps.get(1)?.as_str().parse().ok()?;
        return Some((RecurrencePattern { value: 1, unit }, whole.range()));
    }

    if let Some(caps) = FREQUENCY_WORD_RE.captures(text) {
        let whole = caps.get(0)?;
        let unit = match caps.get(1)?.as_str().to_lowercase().as_str() {
            "hourly" => RecurrenceUnit::Hours,
            "daily" => RecurrenceUnit::Days,
            "weekly" => RecurrenceUnit::Weeks,
            "monthly" => RecurrenceUnit::Months,
            _ => return None,
        };
        return Some((RecurrencePattern { value: 1, unit }, whole.range()));
    }

    None
}

/// Pattern-only variant of [`find_pattern`].
pub fn parse_pattern(text: &str) -> Option<RecurrencePattern> {
    find_pattern(text).map(|(pattern, _)| pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_n_unit() {
        assert_eq!(
            parse_pattern("drink water every 3 hours"),
            Some(RecurrencePattern {
                value: 3,
                unit: RecurrenceUnit::Hours,
            })
        );
    }

    #[test]
    fn test_every_n_unit_singular() {
        assert_eq!(
            parse_pattern("stretch every 1 hour"),
            Some(RecurrencePattern {
                value: 1,
                unit: RecurrenceUnit::Hours,
            })
        );
    }

    #[test]
    fn test_every_unit_implies_one() {
        assert_eq!(
            parse_pattern("water the plants every week"),
            Some(RecurrencePattern {
                value: 1,
                unit: RecurrenceUnit::Weeks,
            })
        );
    }

    #[test]
    fn test_frequency_words() {
        assert_eq!(
            parse_pattern("take vitamins daily"),
            Some(RecurrencePattern {
                value: 1,
                unit: RecurrenceUnit::Days,
            })
        );
        assert_eq!(
            parse_pattern("hourly check"),
            Some(RecurrencePattern {
                value: 1,
                unit: RecurrenceUnit::Hours,
            })
        );
        assert_eq!(
            parse_pattern("pay rent monthly"),
            Some(RecurrencePattern {
                value: 1,
                unit: RecurrenceUnit::Months,
            })
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            parse_pattern("Backup EVERY 2 Weeks"),
            Some(RecurrencePattern {
                value: 2,
                unit: RecurrenceUnit::Weeks,
            })
        );
    }

    #[test]
    fn test_numbered_form_wins_over_frequency_word() {
        // "every 2 days" and "daily" both present; precedence picks the first grammar.
        assert_eq!(
            parse_pattern("daily standup notes every 2 days"),
            Some(RecurrencePattern {
                value: 2,
                unit: RecurrenceUnit::Days,
            })
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_pattern("call mom"), None);
        assert_eq!(parse_pattern("the everyday grind"), None);
        assert_eq!(parse_pattern("every so often"), None);
    }

    #[test]
    fn test_zero_value_rejected() {
        assert_eq!(parse_pattern("every 0 days"), None);
    }

    #[test]
    fn test_matched_span_covers_phrase() {
        let text = "drink water every 3 hours";
        let (_, span) = find_pattern(text).unwrap();
        assert_eq!(&text[span], "every 3 hours");
    }
}
