// The assistant-memory crate holds everything the assistant remembers between runs:
// - Atomic JSON document persistence
// - Natural-language date/time parsing
// - The meeting store and its expiry sweep
// - The conversation transcript
// - AssistantState, the explicit state object threaded through each operation

pub mod conversation;
pub mod meetings;
pub mod persist;
pub mod state;
pub mod timeparse;

pub use conversation::ConversationState;
pub use meetings::{Meeting, MeetingStore};
pub use persist::JsonFile;
pub use state::{AssistantState, HISTORY_FILE, MEETINGS_FILE};
