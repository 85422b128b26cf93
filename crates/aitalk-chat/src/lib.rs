//! Conversation layer for AiTalk.
//!
//! - [`conversation::Conversation`] — the session being edited plus the unsent draft
//! - [`controller::ChatController`] — single writer of the conversation; dispatches
//!   one request at a time and turns every outcome into transcript entries

pub mod controller;
pub mod conversation;

pub use controller::{ChatController, ChatError, EntryKind, TranscriptEntry};
pub use conversation::{Conversation, Draft};
