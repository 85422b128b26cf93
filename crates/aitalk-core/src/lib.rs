//! AiTalk core — message/session types, session store, transcript filter,
//! image attachments, configuration and path helpers.

pub mod attachment;
pub mod config;
pub mod filter;
pub mod session;
pub mod types;
pub mod utils;

pub use filter::extract_clean_content;
pub use session::{list_sessions, load_session, save_session, SessionStore, StoreError};
pub use types::{ContentPart, ImageUrl, Message, MessageContent, Role, Session};
