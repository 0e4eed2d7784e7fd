use assistant_core::types::{ChatTurn, Role};
use serde::{Deserialize, Serialize};

/// Ordered, append-only chat transcript. Serializes as a bare JSON array.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationState {
    turns: Vec<ChatTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(ChatTurn::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(ChatTurn::assistant(text));
    }

    /// The last `max` turns, trimmed so the window never opens on an
    /// assistant turn.
    pub fn recent(&self, max: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(max);
        let mut window = &self.turns[start..];
        while let Some((first, rest)) = window.split_first() {
            if first.role == Role::User {
                break;
            }
            window = rest;
        }
        window
    }

    /// Drops the whole transcript.
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::JsonFile;
    use tempfile::tempdir;

    fn sample() -> ConversationState {
        let mut state = ConversationState::new();
        state.push_user("hello");
        state.push_assistant("Hi! How can I help?");
        state.push_user("show meetings");
        state.push_assistant("No upcoming meetings found.");
        state
    }

    #[test]
    fn test_persist_and_reload_roundtrip() {
        let dir = tempdir().unwrap();
        let mut file = JsonFile::new(dir.path().join("chat_history.json"));

        let state = sample();
        file.save(&state).unwrap();

        let reloaded: ConversationState = file.load_or_default();
        assert_eq!(reloaded, state);
        assert_eq!(reloaded.turns()[2].text, "show meetings");
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_value(sample()).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 4);
        assert_eq!(array[0]["role"], "user");
        assert_eq!(array[1]["role"], "assistant");
    }

    #[test]
    fn test_recent_starts_on_user_turn() {
        let state = sample();
        assert_eq!(state.recent(10).len(), 4);
        assert_eq!(state.recent(2).len(), 2);
        // Window of 3 would open on an assistant reply
        let window = state.recent(3);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].role, Role::User);
        assert!(state.recent(0).is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = sample();
        state.reset();
        assert!(state.is_empty());
    }
}
