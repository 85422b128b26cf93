//! Session store — one pretty-printed JSON file per saved conversation.
//!
//! # Disk format
//!
//! Each session is `{base_name}_{YYYY-MM-DD_HH-MM-SS}.json` in a single flat
//! directory (default `~/.aitalk/sessions/`):
//!
//! ```json
//! {
//!   "api_url": "https://api.openai.com/v1/chat/completions",
//!   "api_key": "sk-...",
//!   "model": "gpt-4o",
//!   "messages": [{"role": "user", "content": "hello"}]
//! }
//! ```

pub mod store;

pub use store::{list_sessions, load_session, save_session, SessionStore, StoreError};
