// Shared building blocks for the office assistant:
// - Chat completions client and the ChatModel seam
// - Chat and wire data structures
// - Configuration loading
// - Shared error types

// Export client module - API client for the hosted model
pub mod client;
pub use client::*;

// Export types module - Chat turns and request/response data structures
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
