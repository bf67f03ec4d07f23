//! Natural-language date/time resolution.
//!
//! The resolver is a collaborator behind the [`DateResolver`] trait so a
//! richer engine can be injected; the built-in [`RuleResolver`] covers the
//! phrasing a reminder bot actually sees: relative offsets ("in 2 hours"),
//! named days ("tomorrow", "tonight"), weekday names ("next friday"),
//! month-day dates ("on march 5"), and clock times ("at 7:30pm").
//!
//! All resolution is forward-biased: an ambiguous phrase resolves to its
//! nearest future interpretation. This means "last friday" resolves to a
//! future friday; that is accepted behavior for a tool that can only
//! schedule ahead.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

/// Which calendar fields the phrase stated explicitly, as opposed to fields
/// implied by the reference instant or by defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub day: bool,
    pub month: bool,
    pub hour: bool,
    pub minute: bool,
}

/// One resolved time expression: the matched byte spans (a date part and a
/// clock part may be disjoint), the resulting UTC instant, and the field
/// certainty flags.
#[derive(Debug, Clone)]
pub struct ResolvedTime {
    pub spans: Vec<Range<usize>>,
    pub instant: DateTime<Utc>,
    pub explicit: FieldFlags,
}

/// Date/time phrase resolver contract. Implementations must prefer future
/// interpretations and anchor relative phrases at `reference`.
pub trait DateResolver: Send + Sync {
    /// Resolve time expressions in `text`. The first entry is the best
    /// match; an empty vec means no time expression was found.
    fn resolve(&self, text: &str, reference: DateTime<Utc>, tz: Tz) -> Vec<ResolvedTime>;
}

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bin\s+(\d+|an?)\s+(minute|hour|day|week|month)s?\b").unwrap()
});

static NAMED_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(tomorrow|today|tonight)\b").unwrap());

static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:next|this|last|on)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .unwrap()
});

static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:on\s+)?(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2})(?:st|nd|rd|th)?\b",
    )
    .unwrap()
});

static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:on\s+)?(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(january|february|march|april|may|june|july|august|september|october|november|december)\b",
    )
    .unwrap()
});

static CLOCK_AMPM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").unwrap());

static CLOCK_24H_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?(\d{1,2}):(\d{2})\b").unwrap());

static NOON_MIDNIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?(noon|midnight)\b").unwrap());

static AT_BARE_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})\b").unwrap());

/// Hour a date-only phrase resolves to: "tomorrow" means tomorrow morning.
const DEFAULT_HOUR: u32 = 9;

/// Hour "tonight" resolves to when no clock time is given.
const TONIGHT_HOUR: u32 = 20;

/// Rule-based resolver built on regex and chrono calendar arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleResolver;

struct DatePart {
    span: Range<usize>,
    date: NaiveDate,
    /// Pre-set hour for phrases like "tonight".
    implied_hour: Option<u32>,
}

struct ClockPart {
    span: Range<usize>,
    hour: u32,
    minute: u32,
    explicit_minute: bool,
}

impl DateResolver for RuleResolver {
    fn resolve(&self, text: &str, reference: DateTime<Utc>, tz: Tz) -> Vec<ResolvedTime> {
        // Relative offsets with sub-day units are complete on their own.
        if let Some(resolved) = resolve_relative(text, reference, tz) {
            return vec![resolved];
        }

        let date_part = find_date_part(text, reference, tz);
        let clock_part = find_clock_part(text);

        let local_ref = reference.with_timezone(&tz);

        match (date_part, clock_part) {
            (Some(date), Some(clock)) => {
                let naive = date.date.and_hms_opt(clock.hour, clock.minute, 0);
                let Some(instant) = naive.and_then(|n| local_to_utc(n, tz)) else {
                    return Vec::new();
                };
                vec![ResolvedTime {
                    spans: vec![date.span, clock.span],
                    instant,
                    explicit: FieldFlags {
                        day: true,
                        month: true,
                        hour: true,
                        minute: clock.explicit_minute,
                    },
                }]
            }
            (Some(date), None) => {
                let hour = date.implied_hour.unwrap_or(DEFAULT_HOUR);
                let naive = date.date.and_hms_opt(hour, 0, 0);
                let Some(instant) = naive.and_then(|n| local_to_utc(n, tz)) else {
                    return Vec::new();
                };
                vec![ResolvedTime {
                    spans: vec![date.span],
                    instant,
                    explicit: FieldFlags {
                        day: true,
                        month: true,
                        hour: false,
                        minute: false,
                    },
                }]
            }
            (None, Some(clock)) => {
                // Today at that time, rolling forward a day if already past.
                let naive = local_ref.date_naive().and_hms_opt(clock.hour, clock.minute, 0);
                let Some(mut instant) = naive.and_then(|n| local_to_utc(n, tz)) else {
                    return Vec::new();
                };
                if instant <= reference {
                    let Some(next) = naive
                        .and_then(|n| n.checked_add_days(chrono::Days::new(1)))
                        .and_then(|n| local_to_utc(n, tz))
                    else {
                        return Vec::new();
                    };
                    instant = next;
                }
                vec![ResolvedTime {
                    spans: vec![clock.span],
                    instant,
                    explicit: FieldFlags {
                        day: false,
                        month: false,
                        hour: true,
                        minute: clock.explicit_minute,
                    },
                }]
            }
            (None, None) => Vec::new(),
        }
    }
}

/// "in 10 minutes", "in 2 hours", "in a week". Sub-day units resolve
/// directly from the reference; day-and-above units still honor a trailing
/// clock part ("in 2 days at 7pm").
fn resolve_relative(text: &str, reference: DateTime<Utc>, tz: Tz) -> Option<ResolvedTime> {
    let caps = RELATIVE_RE.captures(text)?;
    let whole = caps.get(0)?;
    let raw_value = caps.get(1)?.as_str();
    let value: i64 = if raw_value.eq_ignore_ascii_case("a") || raw_value.eq_ignore_ascii_case("an")
    {
        1
    } else {
        raw_value.parse().ok()?
    };
    let unit = caps.get(2)?.as_str().to_lowercase();

    let (base, sub_day) = match unit.as_str() {
        "minute" => (reference.checked_add_signed(Duration::minutes(value))?, true),
        "hour" => (reference.checked_add_signed(Duration::hours(value))?, true),
        "day" => (reference.checked_add_signed(Duration::days(value))?, false),
        "week" => (reference.checked_add_signed(Duration::weeks(value))?, false),
        "month" => (reference.checked_add_months(Months::new(u32::try_from(value).ok()?))?, false),
        _ => return None,
    };

    if sub_day {
        return Some(ResolvedTime {
            spans: vec![whole.range()],
            instant: base,
            explicit: FieldFlags {
                day: true,
                month: true,
                hour: true,
                minute: true,
            },
        });
    }

    // Day-granular offset: combine with an explicit clock part if present,
    // otherwise keep the reference's time of day.
    let mut spans = vec![whole.range()];
    let mut explicit = FieldFlags {
        day: true,
        month: true,
        hour: false,
        minute: false,
    };
    let mut instant = base;

    if let Some(clock) = find_clock_part_outside(text, &whole.range()) {
        let local = base.with_timezone(&tz);
        let naive = local.date_naive().and_hms_opt(clock.hour, clock.minute, 0)?;
        instant = local_to_utc(naive, tz)?;
        explicit.hour = true;
        explicit.minute = clock.explicit_minute;
        spans.push(clock.span);
    }

    Some(ResolvedTime {
        spans,
        instant,
        explicit,
    })
}

fn find_date_part(text: &str, reference: DateTime<Utc>, tz: Tz) -> Option<DatePart> {
    let local_ref = reference.with_timezone(&tz);
    let today = local_ref.date_naive();

    if let Some(caps) = NAMED_DAY_RE.captures(text) {
        let whole = caps.get(0)?;
        let word = caps.get(1)?.as_str().to_lowercase();
        let (date, implied_hour) = match word.as_str() {
            "tomorrow" => (today.succ_opt()?, None),
            "tonight" => (today, Some(TONIGHT_HOUR)),
            _ => (today, None),
        };
        return Some(DatePart {
            span: whole.range(),
            date,
            implied_hour,
        });
    }

    if let Some(caps) = WEEKDAY_RE.captures(text) {
        let whole = caps.get(0)?;
        let target = weekday_number(caps.get(1)?.as_str())?;
        let current = today.weekday().num_days_from_monday();
        // Strictly future: a bare weekday name never means today.
        let ahead = ((target + 7 - current - 1) % 7) + 1;
        return Some(DatePart {
            span: whole.range(),
            date: today.checked_add_days(chrono::Days::new(u64::from(ahead)))?,
            implied_hour: None,
        });
    }

    let (whole, month, day) = if let Some(caps) = MONTH_DAY_RE.captures(text) {
        (
            caps.get(0)?.range(),
            month_number(caps.get(1)?.as_str())?,
            caps.get(2)?.as_str().parse::<u32>().ok()?,
        )
    } else if let Some(caps) = DAY_MONTH_RE.captures(text) {
        (
            caps.get(0)?.range(),
            month_number(caps.get(2)?.as_str())?,
            caps.get(1)?.as_str().parse::<u32>().ok()?,
        )
    } else {
        return None;
    };

    let mut date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        date = NaiveDate::from_ymd_opt(today.year() + 1, month, day)?;
    }
    Some(DatePart {
        span: whole,
        date,
        implied_hour: None,
    })
}

fn find_clock_part(text: &str) -> Option<ClockPart> {
    find_clock_part_outside(text, &(0..0))
}

/// Find a clock expression whose span does not overlap `exclude`.
fn find_clock_part_outside(text: &str, exclude: &Range<usize>) -> Option<ClockPart> {
    let overlaps = |r: &Range<usize>| r.start < exclude.end && exclude.start < r.end;

    for caps in CLOCK_AMPM_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if overlaps(&whole.range()) {
            continue;
        }
        let raw_hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        if !(1..=12).contains(&raw_hour) {
            continue;
        }
        let (minute, explicit_minute) = match caps.get(2) {
            Some(m) => (m.as_str().parse::<u32>().ok()?, true),
            None => (0, false),
        };
        if minute > 59 {
            continue;
        }
        let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
        let hour = match (raw_hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return Some(ClockPart {
            span: whole.range(),
            hour,
            minute,
            explicit_minute,
        });
    }

    for caps in CLOCK_24H_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if overlaps(&whole.range()) {
            continue;
        }
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        if hour > 23 || minute > 59 {
            continue;
        }
        return Some(ClockPart {
            span: whole.range(),
            hour,
            minute,
            explicit_minute: true,
        });
    }

    if let Some(caps) = NOON_MIDNIGHT_RE.captures(text) {
        let whole = caps.get(0)?;
        if !overlaps(&whole.range()) {
            let hour = if caps.get(1)?.as_str().eq_ignore_ascii_case("noon") {
                12
            } else {
                0
            };
            return Some(ClockPart {
                span: whole.range(),
                hour,
                minute: 0,
                explicit_minute: false,
            });
        }
    }

    for caps in AT_BARE_HOUR_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        if overlaps(&whole.range()) {
            continue;
        }
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        if hour > 23 {
            continue;
        }
        return Some(ClockPart {
            span: whole.range(),
            hour,
            minute: 0,
            explicit_minute: false,
        });
    }

    None
}

/// Map a local wall-clock time to UTC, taking the earlier instant for
/// ambiguous times and skipping forward across spring-forward gaps.
fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::None => tz
            .from_local_datetime(&naive.checked_add_signed(Duration::hours(1))?)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn weekday_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "monday" => Some(0),
        "tuesday" => Some(1),
        "wednesday" => Some(2),
        "thursday" => Some(3),
        "friday" => Some(4),
        "saturday" => Some(5),
        "sunday" => Some(6),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn reference() -> DateTime<Utc> {
        // A Wednesday, 10:00 UTC.
        Utc.with_ymd_and_hms(2025, 6, 11, 10, 0, 0).unwrap()
    }

    fn utc() -> Tz {
        chrono_tz::UTC
    }

    fn resolve_one(text: &str) -> ResolvedTime {
        let results = RuleResolver.resolve(text, reference(), utc());
        assert!(!results.is_empty(), "no time expression found in {text:?}");
        results.into_iter().next().unwrap()
    }

    #[test]
    fn test_relative_minutes() {
        let r = resolve_one("take the pizza out in 25 minutes");
        assert_eq!(r.instant, reference() + Duration::minutes(25));
        assert!(r.explicit.hour && r.explicit.minute);
    }

    #[test]
    fn test_relative_article() {
        let r = resolve_one("check the oven in an hour");
        assert_eq!(r.instant, reference() + Duration::hours(1));
    }

    #[test]
    fn test_relative_days_keeps_time_of_day() {
        let r = resolve_one("follow up in 2 days");
        assert_eq!(r.instant, reference() + Duration::days(2));
        assert!(r.explicit.day && !r.explicit.hour);
    }

    #[test]
    fn test_relative_days_with_clock() {
        let r = resolve_one("follow up in 2 days at 7pm");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 13, 19, 0, 0).unwrap());
        assert!(r.explicit.hour);
        assert!(!r.explicit.minute);
        assert_eq!(r.spans.len(), 2);
    }

    #[test]
    fn test_tomorrow_defaults_to_morning() {
        let r = resolve_one("water the plants tomorrow");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap());
        assert!(r.explicit.day && r.explicit.month);
        assert!(!r.explicit.hour);
    }

    #[test]
    fn test_tomorrow_with_clock() {
        let r = resolve_one("water the plants tomorrow at 8am");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 8, 0, 0).unwrap());
        assert!(r.explicit.hour);
        assert!(!r.explicit.minute);
    }

    #[test]
    fn test_explicit_minute_sets_flag() {
        let r = resolve_one("call mom tomorrow at 7:30pm");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 19, 30, 0).unwrap());
        assert!(r.explicit.hour && r.explicit.minute);
    }

    #[test]
    fn test_tonight() {
        let r = resolve_one("take out the trash tonight");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 11, 20, 0, 0).unwrap());
    }

    #[test]
    fn test_time_only_future_today() {
        let r = resolve_one("standup at 14:00");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 11, 14, 0, 0).unwrap());
        assert!(r.explicit.minute);
    }

    #[test]
    fn test_time_only_rolls_to_tomorrow() {
        // 8am has already passed at the 10:00 reference.
        let r = resolve_one("gym at 8am");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_weekday_resolves_forward() {
        // Reference is a Wednesday; friday is two days out.
        let r = resolve_one("submit the report on friday");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 13, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_same_weekday_means_next_week() {
        let r = resolve_one("plan the sprint on wednesday");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 18, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_last_friday_resolves_forward() {
        // Forward bias: past-tense weekday phrasing still lands in the future.
        let r = resolve_one("remember what happened last friday");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 13, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_month_day() {
        let r = resolve_one("renew the domain on july 4");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 7, 4, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_month_day_rolls_to_next_year() {
        let r = resolve_one("wish her happy birthday on january 2nd");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_day_of_month_form() {
        let r = resolve_one("pay taxes on the 15th of july");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_noon() {
        let r = resolve_one("lunch tomorrow at noon");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_midnight_maps_to_hour_zero() {
        let r = resolve_one("deploy tomorrow at midnight");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_twelve_am_pm() {
        let r = resolve_one("tomorrow at 12pm");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 12, 0, 0).unwrap());
        let r = resolve_one("tomorrow at 12am");
        assert_eq!(r.instant, Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_no_time_expression() {
        let results = RuleResolver.resolve("call mom", reference(), utc());
        assert!(results.is_empty());
    }

    #[test]
    fn test_timezone_interpretation() {
        // 7pm New York is 23:00 UTC during DST.
        let tz: Tz = "America/New_York".parse().unwrap();
        let results = RuleResolver.resolve("call mom tomorrow at 7pm", reference(), tz);
        assert_eq!(
            results[0].instant,
            Utc.with_ymd_and_hms(2025, 6, 12, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_spans_cover_matched_text() {
        let text = "water the plants tomorrow at 8am";
        let r = resolve_one(text);
        let matched: Vec<&str> = r.spans.iter().map(|s| &text[s.clone()]).collect();
        assert!(matched.contains(&"tomorrow"));
        assert!(matched.iter().any(|m| m.contains("8am")));
    }
}
