//! Routes each user message to a meeting operation or to the model.
//!
//! Recognition walks an ordered table of matchers; the first one whose phrase
//! appears in the message wins, and anything unmatched is freeform chat.

use std::ops::Range;
use std::sync::LazyLock;

use assistant_core::client::ChatModel;
use assistant_core::errors::StorageError;
use assistant_memory::meetings::Meeting;
use assistant_memory::state::AssistantState;
use assistant_memory::timeparse::{date_phrase_span, parse_when, when_phrase_start};
use chrono::NaiveDateTime;
use log::{debug, warn};
use regex::Regex;

/// Which structured intent a matcher recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    AddMeeting,
    ShowMeetings,
    DeleteMeeting,
}

/// A classified user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddMeeting { title: String, when: Option<String> },
    ShowMeetings,
    DeleteMeeting { selector: String },
    Freeform(String),
}

impl Intent {
    pub fn needs_model(&self) -> bool {
        matches!(self, Intent::Freeform(_))
    }
}

/// Checked first to last. Explicit show verbs come before add so the generic
/// "schedule" keyword cannot shadow them; the bare "my meeting" and
/// "any meeting" forms come after it, since add commands use them too.
const MATCHERS: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::DeleteMeeting,
        &["delete meeting", "remove meeting", "cancel meeting"],
    ),
    (
        IntentKind::ShowMeetings,
        &[
            "show meeting",
            "list meeting",
            "upcoming meeting",
            "view meeting",
            "my schedule",
        ],
    ),
    (
        IntentKind::AddMeeting,
        &[
            "add meeting",
            "schedule",
            "make meeting",
            "create meeting",
            "new meeting",
            "book meeting",
            "set up meeting",
        ],
    ),
    (IntentKind::ShowMeetings, &["any meeting", "my meeting"]),
];

const DETERMINERS: &str = r"(?:(?:a|an|the|my|all|new|our)\s+)?";

/// Builds a case-insensitive, word-bounded pattern for a keyword phrase.
/// "meeting" also matches "meetings" and may be preceded by an article; a
/// phrase without it may be followed by one ("schedule a meeting").
fn phrase_pattern(phrase: &str) -> String {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    match words.split_last() {
        Some((last, head)) if last == "meeting" && !head.is_empty() => {
            format!(r"(?i)\b{}\s+{}meetings?\b", head.join(r"\s+"), DETERMINERS)
        }
        _ => format!(
            r"(?i)\b{}\b(?:\s+{}meetings?\b)?",
            words.join(r"\s+"),
            DETERMINERS
        ),
    }
}

struct Matcher {
    kind: IntentKind,
    patterns: Vec<Regex>,
}

static COMPILED: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    MATCHERS
        .iter()
        .map(|(kind, phrases)| Matcher {
            kind: *kind,
            patterns: phrases
                .iter()
                .map(|p| Regex::new(&phrase_pattern(p)).unwrap())
                .collect(),
        })
        .collect()
});

static AT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+at\s+").unwrap());

const TITLE_FILLERS: &[&str] = &[
    "a", "an", "the", "please", "called", "named", "titled", "for", "about",
];

/// Removes `span` from `text`, joining the two sides with a space.
fn cut(text: &str, span: Range<usize>) -> String {
    format!("{} {}", &text[..span.start], &text[span.end..])
}

fn strip_fillers(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    while let Some(first) = words.first() {
        let bare = first.trim_matches(|c: char| c == ':' || c == ',');
        if bare.is_empty() || TITLE_FILLERS.contains(&bare.to_lowercase().as_str()) {
            words.remove(0);
        } else {
            break;
        }
    }
    words
        .join(" ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == ',' || c == '.' || c == '!' || c == '?')
        .trim()
        .to_string()
}

fn clean_title(raw: &str) -> String {
    let title = strip_fillers(raw);
    if title.is_empty() {
        "Meeting".to_string()
    } else if title.to_lowercase().starts_with("with ") {
        format!("Meeting {}", title)
    } else {
        title
    }
}

/// Splits the text left after removing the keyword into a title and a
/// date/time phrase.
///
/// The split is on the last `at` followed by a date or time, so both
/// "coffee at Starbucks at 10:30" and "sync at 3pm at the office" work.
/// Without such an `at`, the last `at` is used and the time is reported
/// as missing downstream.
fn split_title_and_when(rest: &str) -> (String, Option<String>) {
    let separators: Vec<_> = AT_SEPARATOR.find_iter(rest).collect();
    let chosen = separators
        .iter()
        .rev()
        .find(|sep| when_phrase_start(&rest[sep.end()..]).is_some())
        .or(separators.last());

    if let Some(sep) = chosen {
        let mut title = rest[..sep.start()].trim().to_string();
        let mut when = rest[sep.end()..].trim().to_string();

        // "sync tomorrow at 3pm": the date belongs with the time
        if let Some(span) = date_phrase_span(&title) {
            if title[span.end..].trim().is_empty() {
                when = format!("{} {}", title[span.clone()].trim(), when);
                title = title[..span.start].trim().to_string();
            }
        }
        return (clean_title(&title), Some(when));
    }

    match when_phrase_start(rest) {
        Some(start) => (
            clean_title(&rest[..start]),
            Some(rest[start..].trim().to_string()),
        ),
        None => (clean_title(rest), None),
    }
}

fn build(kind: IntentKind, input: &str, span: Range<usize>) -> Intent {
    let rest = cut(input, span);
    match kind {
        IntentKind::ShowMeetings => Intent::ShowMeetings,
        IntentKind::DeleteMeeting => Intent::DeleteMeeting {
            selector: strip_fillers(&rest),
        },
        IntentKind::AddMeeting => {
            let (title, when) = split_title_and_when(&rest);
            Intent::AddMeeting {
                title,
                when: when.filter(|w| !w.is_empty()),
            }
        }
    }
}

/// Classifies a message. Deterministic: depends only on the text.
pub fn recognize(input: &str) -> Intent {
    for matcher in COMPILED.iter() {
        if let Some(found) = matcher.patterns.iter().find_map(|p| p.find(input)) {
            debug!("Recognized {:?} via '{}'", matcher.kind, found.as_str());
            return build(matcher.kind, input, found.range());
        }
    }
    Intent::Freeform(input.trim().to_string())
}

/// Text shown to the user, and whether it came from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub from_model: bool,
}

impl Reply {
    fn local(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_model: false,
        }
    }
}

fn describe(meeting: &Meeting) -> String {
    format!(
        "{} at {}",
        meeting.date.format("%Y-%m-%d"),
        meeting.time.format("%H:%M")
    )
}

/// Executes intents against the assistant state and the model.
pub struct Dispatcher {
    model: Box<dyn ChatModel>,
    system_prompt: String,
    max_history_turns: usize,
}

impl Dispatcher {
    pub fn new(model: Box<dyn ChatModel>, system_prompt: impl Into<String>, max_history_turns: usize) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            max_history_turns: max_history_turns.max(1),
        }
    }

    /// Recognizes and executes `input`.
    pub async fn dispatch(
        &self,
        input: &str,
        state: &mut AssistantState,
        now: NaiveDateTime,
    ) -> Result<Reply, StorageError> {
        let intent = recognize(input);
        self.execute(input, intent, state, now).await
    }

    /// Runs an already recognized intent. Both the user's message and the
    /// reply are appended to the conversation, which is then saved.
    ///
    /// Only a full disk is returned as an error.
    pub async fn execute(
        &self,
        input: &str,
        intent: Intent,
        state: &mut AssistantState,
        now: NaiveDateTime,
    ) -> Result<Reply, StorageError> {
        state.conversation.push_user(input.trim());

        let reply = match intent {
            Intent::AddMeeting { title, when } => Reply::local(add_meeting(state, &title, when, now)?),
            Intent::ShowMeetings => Reply::local(show_meetings(state, now)?),
            Intent::DeleteMeeting { selector } => Reply::local(delete_meeting(state, &selector, now)?),
            Intent::Freeform(_) => self.freeform(state, now).await?,
        };

        state.conversation.push_assistant(reply.text.clone());
        state.persist_history()?;
        Ok(reply)
    }

    async fn freeform(&self, state: &mut AssistantState, now: NaiveDateTime) -> Result<Reply, StorageError> {
        let upcoming = upcoming(state, now)?;
        let system_prompt = self.system_prompt_for(&upcoming, now);
        let history = state.conversation.recent(self.max_history_turns);

        match self.model.reply(&system_prompt, history).await {
            Ok(text) => Ok(Reply {
                text,
                from_model: true,
            }),
            Err(e) => {
                warn!("Model call failed: {}", e);
                Ok(Reply::local(format!(
                    "I couldn't reach the model right now ({}). Please try again in a moment.",
                    e
                )))
            }
        }
    }

    /// The configured instruction plus the clock and the schedule.
    fn system_prompt_for(&self, upcoming: &[Meeting], now: NaiveDateTime) -> String {
        let mut prompt = format!(
            "{}\n\nCurrent local date and time: {}.",
            self.system_prompt,
            now.format("%A, %d %B %Y %H:%M")
        );
        if upcoming.is_empty() {
            prompt.push_str("\nThe user has no upcoming meetings.");
        } else {
            prompt.push_str("\nThe user's upcoming meetings:");
            for meeting in upcoming.iter().take(10) {
                prompt.push_str(&format!("\n- {} on {}", meeting.title, describe(meeting)));
            }
        }
        prompt
    }
}

/// Lists upcoming meetings, saving the store if the sweep removed any.
fn upcoming(state: &mut AssistantState, now: NaiveDateTime) -> Result<Vec<Meeting>, StorageError> {
    let before = state.meetings.len();
    let list = state.meetings.list(now);
    if list.len() != before {
        state.persist_meetings()?;
    }
    Ok(list)
}

fn add_meeting(
    state: &mut AssistantState,
    title: &str,
    when: Option<String>,
    now: NaiveDateTime,
) -> Result<String, StorageError> {
    let Some(when) = when else {
        return Ok("Please provide a time, e.g. 'schedule meeting with HR at 2pm'.".to_string());
    };

    let at = match parse_when(&when, now) {
        Ok(at) => at,
        Err(e) => {
            return Ok(format!(
                "{}. Try something like 'schedule team sync tomorrow at 3pm'.",
                e
            ));
        }
    };

    if at < now {
        return Ok(format!(
            "{} has already passed. Try something like 'tomorrow {}'.",
            at.format("%Y-%m-%d %H:%M"),
            at.format("%-I%P")
        ));
    }

    match state.meetings.add_at(title, at) {
        Ok(meeting) => {
            state.persist_meetings()?;
            Ok(format!(
                "Meeting '{}' scheduled for {}.",
                meeting.title,
                describe(&meeting)
            ))
        }
        Err(e) => Ok(format!("{}.", e)),
    }
}

fn show_meetings(state: &mut AssistantState, now: NaiveDateTime) -> Result<String, StorageError> {
    let upcoming = upcoming(state, now)?;
    if upcoming.is_empty() {
        return Ok("No upcoming meetings found.".to_string());
    }

    let mut text = String::from("Upcoming meetings:");
    for (i, meeting) in upcoming.iter().enumerate() {
        text.push_str(&format!("\n{}. {} — {}", i + 1, meeting.title, describe(meeting)));
    }
    Ok(text)
}

/// Deletes at most one upcoming meeting; expired ones are swept first so
/// they can never be matched.
fn delete_meeting(state: &mut AssistantState, selector: &str, now: NaiveDateTime) -> Result<String, StorageError> {
    if selector.trim().is_empty() {
        return Ok("Which meeting should I delete? e.g. 'delete meeting Project Discussion'.".to_string());
    }

    upcoming(state, now)?;

    match state.meetings.remove_matching(selector) {
        Some(meeting) => {
            state.persist_meetings()?;
            Ok(format!(
                "Deleted meeting '{}' ({}).",
                meeting.title,
                describe(&meeting)
            ))
        }
        None => Ok(format!("Meeting not found: no single meeting matches '{}'.", selector)),
    }
}
