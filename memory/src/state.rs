use std::path::Path;

use assistant_core::errors::StorageError;
use chrono::NaiveDateTime;
use log::info;

use crate::conversation::ConversationState;
use crate::meetings::{Meeting, MeetingStore};
use crate::persist::JsonFile;

pub const HISTORY_FILE: &str = "chat_history.json";
pub const MEETINGS_FILE: &str = "meetings.json";

/// Everything the assistant remembers, passed explicitly to each operation.
#[derive(Debug)]
pub struct AssistantState {
    pub conversation: ConversationState,
    pub meetings: MeetingStore,
    history_file: JsonFile,
    meetings_file: JsonFile,
}

/// Non-fatal storage errors were already logged by the file; only a full disk
/// is passed on.
fn only_fatal(result: Result<(), StorageError>) -> Result<(), StorageError> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        _ => Ok(()),
    }
}

impl AssistantState {
    /// Loads both documents from `data_dir` (failing open) and sweeps
    /// meetings that ended before `now`.
    pub fn open(data_dir: &Path, now: NaiveDateTime) -> Result<Self, StorageError> {
        let mut history_file = JsonFile::new(data_dir.join(HISTORY_FILE));
        let mut meetings_file = JsonFile::new(data_dir.join(MEETINGS_FILE));

        let conversation: ConversationState = history_file.load_or_default();
        let loaded: Vec<Meeting> = meetings_file.load_or_default();

        let mut state = Self {
            conversation,
            meetings: MeetingStore::from_meetings(loaded),
            history_file,
            meetings_file,
        };

        let swept = state.meetings.sweep(now);
        if swept > 0 {
            info!("Removed {} past meeting(s) at startup", swept);
            state.persist_meetings()?;
        }

        Ok(state)
    }

    pub fn history_path(&self) -> &Path {
        self.history_file.path()
    }

    /// Writes the transcript. Errors only on a full disk.
    pub fn persist_history(&mut self) -> Result<(), StorageError> {
        only_fatal(self.history_file.save(&self.conversation))
    }

    /// Writes the meeting list. Errors only on a full disk.
    pub fn persist_meetings(&mut self) -> Result<(), StorageError> {
        only_fatal(self.meetings_file.save(&self.meetings.meetings()))
    }

    /// Clears the transcript in memory and on disk.
    pub fn reset_history(&mut self) -> Result<(), StorageError> {
        self.conversation.reset();
        self.persist_history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_open_empty_dir() {
        let dir = tempdir().unwrap();
        let state = AssistantState::open(dir.path(), at(8)).unwrap();
        assert!(state.conversation.is_empty());
        assert!(state.meetings.is_empty());
        // Nothing written until there is something to write
        assert!(!state.history_path().exists());
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = tempdir().unwrap();
        {
            let mut state = AssistantState::open(dir.path(), at(8)).unwrap();
            state.meetings.add("Project Discussion", "10am", None, at(8).date()).unwrap();
            state.conversation.push_user("add meeting Project Discussion at 10am");
            state.conversation.push_assistant("Meeting scheduled.");
            state.persist_meetings().unwrap();
            state.persist_history().unwrap();
        }

        let state = AssistantState::open(dir.path(), at(9)).unwrap();
        assert_eq!(state.conversation.len(), 2);
        assert_eq!(state.meetings.len(), 1);
        assert_eq!(state.meetings.meetings()[0].title, "Project Discussion");
    }

    #[test]
    fn test_open_sweeps_and_rewrites() {
        let dir = tempdir().unwrap();
        {
            let mut state = AssistantState::open(dir.path(), at(6)).unwrap();
            state.meetings.add("Early", "7am", None, at(6).date()).unwrap();
            state.meetings.add("Late", "5pm", None, at(6).date()).unwrap();
            state.persist_meetings().unwrap();
        }

        let state = AssistantState::open(dir.path(), at(12)).unwrap();
        assert_eq!(state.meetings.len(), 1);

        let on_disk: Vec<Meeting> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MEETINGS_FILE)).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].title, "Late");
    }

    #[test]
    fn test_corrupt_files_fail_open() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "[{broken").unwrap();
        fs::write(dir.path().join(MEETINGS_FILE), "not json at all").unwrap();

        let mut state = AssistantState::open(dir.path(), at(8)).unwrap();
        assert!(state.conversation.is_empty());
        assert!(state.meetings.is_empty());

        // Writing afterwards replaces the corrupt document
        state.conversation.push_user("hi");
        state.persist_history().unwrap();
        let reopened = AssistantState::open(dir.path(), at(8)).unwrap();
        assert_eq!(reopened.conversation.len(), 1);
    }

    #[test]
    fn test_reset_history() {
        let dir = tempdir().unwrap();
        let mut state = AssistantState::open(dir.path(), at(8)).unwrap();
        state.conversation.push_user("hi");
        state.persist_history().unwrap();

        state.reset_history().unwrap();
        let reopened = AssistantState::open(dir.path(), at(8)).unwrap();
        assert!(reopened.conversation.is_empty());
    }
}
