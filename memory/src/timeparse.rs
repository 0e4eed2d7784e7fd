//! Natural-language date and time parsing for meeting requests.
//!
//! Every accepted time-of-day normalizes to a minute-precision 24-hour
//! `NaiveTime`, so "8am", "8:00 a.m." and "08:00" compare equal.

use std::ops::Range;
use std::sync::LazyLock;

use assistant_core::errors::ValidationError;
use chrono::{Datelike, Duration, Month, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

/// Time used when a date is given without a time.
pub const DEFAULT_MEETING_TIME: (u32, u32) = (9, 0);

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)?$").unwrap());

static TIME_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:\d{1,2}(?:[:.]\d{2})?\s*(?:am|pm)|\d{1,2}:\d{2}|noon|midday|midnight)\b").unwrap()
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:on\s+)?(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static RELATIVE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(day after tomorrow|tomorrow|today)\b").unwrap());

static NEXT_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnext\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:on\s+)?(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b",
    )
    .unwrap()
});

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:on\s+|this\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
});

/// A date phrase found inside a larger piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePhrase {
    pub date: NaiveDate,
    /// Byte range of the phrase in the searched text
    pub span: Range<usize>,
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .trim_end_matches(['.', '!', '?'])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a standalone time-of-day such as `8am`, `8:30 pm`, `20:00` or `noon`.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ValidationError> {
    let normalized = normalize(text);
    let unparseable = || ValidationError::UnparseableTime(text.trim().to_string());

    match normalized.as_str() {
        "noon" | "midday" => return Ok(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()),
        "midnight" => return Ok(NaiveTime::default()),
        _ => {}
    }

    let caps = TIME_OF_DAY.captures(&normalized).ok_or_else(unparseable)?;
    let hour: u32 = caps[1].parse().map_err(|_| unparseable())?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| unparseable())?,
        None => 0,
    };

    let hour = match caps.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return Err(unparseable());
            }
            match meridiem {
                "am" => hour % 12,
                _ => hour % 12 + 12,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(unparseable)
}

fn days_until(from: Weekday, to: Weekday) -> i64 {
    ((to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7) as i64
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    name.to_lowercase().parse::<Weekday>().ok()
}

/// Finds the first date phrase in `text`, resolved relative to `today`.
///
/// Invalid calendar dates (e.g. `2026-02-30`) are reported as errors rather
/// than skipped so the caller can tell the user.
pub fn find_date_phrase(text: &str, today: NaiveDate) -> Result<Option<DatePhrase>, ValidationError> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let (y, m, d) = (&caps[1], &caps[2], &caps[3]);
        let date = match (y.parse::<i32>(), m.parse::<u32>(), d.parse::<u32>()) {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        }
        .ok_or_else(|| ValidationError::UnparseableTime(text[whole.clone()].to_string()))?;
        return Ok(Some(DatePhrase { date, span: whole }));
    }

    if let Some(caps) = RELATIVE_DAY.captures(text) {
        let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let offset = match caps[1].to_lowercase().as_str() {
            "today" => 0,
            "tomorrow" => 1,
            _ => 2,
        };
        return Ok(Some(DatePhrase {
            date: today + Duration::days(offset),
            span,
        }));
    }

    if let Some(caps) = NEXT_WEEKDAY.captures(text) {
        if let Some(target) = parse_weekday(&caps[1]) {
            let mut ahead = days_until(today.weekday(), target);
            if ahead == 0 {
                ahead = 7;
            }
            return Ok(Some(DatePhrase {
                date: today + Duration::days(ahead),
                span: caps.get(0).map(|m| m.range()).unwrap_or_default(),
            }));
        }
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let invalid = || ValidationError::UnparseableTime(text[span.clone()].to_string());
        let month = caps[1]
            .to_lowercase()
            .parse::<Month>()
            .map_err(|_| invalid())?
            .number_from_month();
        let day: u32 = caps[2].parse().map_err(|_| invalid())?;

        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
        let date = match this_year {
            Some(date) if date >= today => date,
            _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or_else(invalid)?,
        };
        return Ok(Some(DatePhrase { date, span }));
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        if let Some(target) = parse_weekday(&caps[1]) {
            return Ok(Some(DatePhrase {
                date: today + Duration::days(days_until(today.weekday(), target)),
                span: caps.get(0).map(|m| m.range()).unwrap_or_default(),
            }));
        }
    }

    Ok(None)
}

/// Byte range of the first date phrase in `text`, without resolving it.
///
/// Checks the same patterns in the same order as [`find_date_phrase`].
pub fn date_phrase_span(text: &str) -> Option<Range<usize>> {
    [&*ISO_DATE, &*RELATIVE_DAY, &*NEXT_WEEKDAY, &*MONTH_DAY, &*WEEKDAY]
        .into_iter()
        .find_map(|re| re.find(text))
        .map(|m| m.range())
}

/// Where the date or time part of a sentence begins, if it has one.
pub fn when_phrase_start(text: &str) -> Option<usize> {
    let date = date_phrase_span(text).map(|r| r.start);
    let time = TIME_IN_TEXT.find(text).map(|m| m.start());
    match (date, time) {
        (Some(d), Some(t)) => Some(d.min(t)),
        (d, t) => d.or(t),
    }
}

fn strip_connectives(text: &str) -> &str {
    let mut rest = text.trim_matches(|c: char| c == ',' || c.is_whitespace());
    loop {
        let before = rest;
        for word in ["at ", "on ", "by "] {
            if let Some(stripped) = rest.strip_prefix(word) {
                rest = stripped.trim_start();
            }
        }
        if rest == before {
            return rest;
        }
    }
}

/// Parses a phrase such as `tomorrow 3pm`, `next monday at 10am`, `20:00` or
/// `2026-10-21 14:00` into a local date and time.
///
/// A missing date means `now`'s date; a missing time after a date means 09:00.
pub fn parse_when(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ValidationError> {
    let normalized = normalize(text);
    let original = text.trim().to_string();

    let date_phrase = find_date_phrase(&normalized, now.date())?;
    let rest = match &date_phrase {
        Some(phrase) => format!(
            "{} {}",
            &normalized[..phrase.span.start],
            &normalized[phrase.span.end..]
        ),
        None => normalized.clone(),
    };
    let rest = strip_connectives(&rest);

    let time = if rest.is_empty() {
        None
    } else if let Ok(time) = parse_time_of_day(rest) {
        Some(time)
    } else if let Some(found) = TIME_IN_TEXT.find(rest) {
        Some(parse_time_of_day(found.as_str()).map_err(|_| ValidationError::UnparseableTime(original.clone()))?)
    } else if rest.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::UnparseableTime(original));
    } else {
        None
    };

    match (date_phrase, time) {
        (Some(phrase), Some(time)) => Ok(phrase.date.and_time(time)),
        (Some(phrase), None) => {
            let (h, m) = DEFAULT_MEETING_TIME;
            Ok(phrase.date.and_hms_opt(h, m, 0).unwrap_or_default())
        }
        (None, Some(time)) => Ok(now.date().and_time(time)),
        (None, None) => Err(ValidationError::MissingTime(original)),
    }
}
