use std::collections::HashSet;
use std::fmt;

use assistant_core::errors::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timeparse::parse_time_of_day;

/// A scheduled meeting. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    /// Canonical 24-hour `HH:MM`
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    fn new(title: String, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            date,
            time,
            created_at: Utc::now(),
        }
    }

    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// First block of the id, enough to tell meetings apart on screen.
    pub fn short_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }
}

impl fmt::Display for Meeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at {}",
            self.title,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M")
        )
    }
}

mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let parsed = NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)?;
        NaiveTime::from_hms_opt(parsed.hour(), parsed.minute(), 0)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", raw)))
    }
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// What a delete request refers to: a title fragment, a time, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    title: Option<String>,
    time: Option<NaiveTime>,
}

impl Selector {
    fn parse(raw: &str) -> Option<Self> {
        let folded = fold(raw.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace()));
        if folded.is_empty() {
            return None;
        }

        let time_only = folded.strip_prefix("at ").unwrap_or(folded.as_str());
        if let Ok(time) = parse_time_of_day(time_only) {
            return Some(Self { title: None, time: Some(time) });
        }

        if let Some(idx) = folded.rfind(" at ") {
            if let Ok(time) = parse_time_of_day(&folded[idx + 4..]) {
                let title = folded[..idx].trim().to_string();
                return Some(Self {
                    title: (!title.is_empty()).then_some(title),
                    time: Some(time),
                });
            }
        }

        Some(Self { title: Some(folded), time: None })
    }

    fn time_matches(&self, meeting: &Meeting) -> bool {
        self.time.map_or(true, |t| meeting.time == t)
    }
}

/// In-memory meeting list. Persistence is the caller's concern.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeetingStore {
    meetings: Vec<Meeting>,
}

impl MeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from loaded records, re-issuing duplicate or blank ids.
    pub fn from_meetings(meetings: Vec<Meeting>) -> Self {
        let mut seen = HashSet::new();
        let meetings = meetings
            .into_iter()
            .map(|mut meeting| {
                meeting.time = truncate_to_minute(meeting.time);
                if meeting.id.trim().is_empty() || !seen.insert(meeting.id.clone()) {
                    meeting.id = Uuid::new_v4().to_string();
                    seen.insert(meeting.id.clone());
                    debug!("Re-issued id for meeting '{}'", meeting.title);
                }
                meeting
            })
            .collect();
        Self { meetings }
    }

    /// All stored meetings in insertion order, expired ones included.
    pub fn meetings(&self) -> &[Meeting] {
        &self.meetings
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    /// Adds a meeting, parsing `time` as a time-of-day. `date` defaults to `today`.
    pub fn add(
        &mut self,
        title: &str,
        time: &str,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Meeting, ValidationError> {
        let time = parse_time_of_day(time)?;
        self.add_at(title, date.unwrap_or(today).and_time(time))
    }

    /// Adds a meeting at an already resolved date and time.
    pub fn add_at(&mut self, title: &str, when: NaiveDateTime) -> Result<Meeting, ValidationError> {
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let meeting = Meeting::new(title, when.date(), truncate_to_minute(when.time()));
        debug!("Added meeting {} ({})", meeting, meeting.short_id());
        self.meetings.push(meeting.clone());
        Ok(meeting)
    }

    /// Upcoming meetings ordered by date then time. Sweeps first.
    pub fn list(&mut self, now: NaiveDateTime) -> Vec<Meeting> {
        self.sweep(now);
        let mut upcoming = self.meetings.clone();
        upcoming.sort_by(|a, b| {
            a.scheduled_at()
                .cmp(&b.scheduled_at())
                .then_with(|| a.title.cmp(&b.title))
        });
        upcoming
    }

    /// Removes every meeting scheduled strictly before `now`; returns how many.
    pub fn sweep(&mut self, now: NaiveDateTime) -> usize {
        let before = self.meetings.len();
        self.meetings.retain(|m| m.scheduled_at() >= now);
        let removed = before - self.meetings.len();
        if removed > 0 {
            debug!("Swept {} expired meeting(s)", removed);
        }
        removed
    }

    /// Removes at most one meeting matching `selector`.
    ///
    /// An exact (case-insensitive) title match wins, earliest first. Otherwise a
    /// title substring match is used only when it is unambiguous. A trailing
    /// `at <time>`, or a bare time, narrows the match by time.
    pub fn remove_matching(&mut self, selector: &str) -> Option<Meeting> {
        let selector = Selector::parse(selector)?;

        let exact = self
            .meetings
            .iter()
            .enumerate()
            .filter(|(_, m)| selector.time_matches(m))
            .filter(|(_, m)| selector.title.as_ref().map_or(true, |t| fold(&m.title) == *t))
            .min_by_key(|(_, m)| m.scheduled_at())
            .map(|(i, _)| i);

        let index = match exact {
            Some(i) => i,
            None => {
                let fragment = selector.title.as_ref()?;
                let candidates: Vec<usize> = self
                    .meetings
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| selector.time_matches(m))
                    .filter(|(_, m)| {
                        let title = fold(&m.title);
                        title.contains(fragment.as_str()) || fragment.contains(title.as_str())
                    })
                    .map(|(i, _)| i)
                    .collect();
                match candidates.as_slice() {
                    [only] => *only,
                    _ => return None,
                }
            }
        };

        Some(self.meetings.remove(index))
    }

    /// `true` if a meeting was removed; not finding one is not an error.
    pub fn delete(&mut self, selector: &str) -> bool {
        self.remove_matching(selector).is_some()
    }
}
