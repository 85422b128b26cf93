//! Chat provider trait — the seam between the conversation and the network.

use async_trait::async_trait;
use thiserror::Error;

use aitalk_core::types::{Message, Session};

/// Per-request connection settings, taken from the session being chatted in.
#[derive(Clone)]
pub struct ChatSettings {
    /// Full chat completions URL.
    pub endpoint: String,
    /// Bearer token.
    pub credential: String,
    /// Model identifier.
    pub model: String,
    /// Optional persona prompt, sent as a leading system message.
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("endpoint", &self.endpoint)
            .field("credential", &aitalk_core::utils::mask_secret(&self.credential))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl ChatSettings {
    pub fn from_session(session: &Session, system_prompt: Option<&str>) -> Self {
        ChatSettings {
            endpoint: session.endpoint.clone(),
            credential: session.credential.clone(),
            model: session.model.clone(),
            system_prompt: system_prompt.map(str::to_string),
        }
    }
}

/// A successful chat completion: the raw `content` of the first choice.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatReply {
    pub content: serde_json::Value,
}

/// Errors from talking to a chat API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with an error object (or no `choices`).
    #[error("{0}")]
    Api(String),

    /// The response was not the JSON we expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait implemented by chat backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the conversation and return the assistant reply.
    ///
    /// Only `role` and `content` of each message are transmitted.
    async fn chat(&self, settings: &ChatSettings, messages: &[Message]) -> Result<ChatReply, ProviderError>;

    /// List model ids available at the settings' endpoint.
    async fn list_models(&self, settings: &ChatSettings) -> Result<Vec<String>, ProviderError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
