//! Chat transport for AiTalk.
//!
//! # Architecture
//!
//! - [`traits::ChatProvider`] — trait the conversation controller talks to
//! - [`http_provider::HttpProvider`] — OpenAI-compatible HTTP client (chat + model discovery)

pub mod http_provider;
pub mod traits;

pub use http_provider::{models_url, HttpProvider};
pub use traits::{ChatProvider, ChatReply, ChatSettings, ProviderError};
