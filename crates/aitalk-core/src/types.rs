//! Core types for AiTalk — the persisted session record and the messages it holds.
//!
//! Messages follow the OpenAI chat completions format: `role` + `content`, where
//! content is either a plain string or a list of typed parts (text / image_url).
//! Assistant turns additionally carry `time` and `model` metadata, which are
//! persisted in session files but never sent over the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One turn of a conversation.
///
/// The shape of `content` (text vs. parts) is chosen by the constructor and
/// never changes afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "content_from_any")]
    pub content: MessageContent,
    /// Local wall-clock time the reply arrived (`YYYY-MM-DD HH:MM:SS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Model that produced the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_content(Role::System, MessageContent::Text(content.into()))
    }

    /// Create a user message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(Role::User, MessageContent::Text(content.into()))
    }

    /// Create a user message with multipart content (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::with_content(Role::User, MessageContent::Parts(parts))
    }

    /// Create an assistant message with text content and no metadata.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, MessageContent::Text(content.into()))
    }

    /// Create an assistant reply stamped with the current local time and the model name.
    pub fn assistant_reply(content: MessageContent, model: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content,
            time: Some(crate::utils::local_timestamp()),
            model: Some(model.into()),
        }
    }

    fn with_content(role: Role, content: MessageContent) -> Self {
        Message {
            role,
            content,
            time: None,
            model: None,
        }
    }
}

/// Accept any JSON value as stored content; `null` becomes empty text.
fn content_from_any<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(MessageContent::from_value(&value))
}

// ─────────────────────────────────────────────
// Message Content (text or multipart/vision)
// ─────────────────────────────────────────────

/// Message content — either plain text or multipart (for vision/images).
///
/// When serialized: text becomes a plain string, parts become an array of objects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// Convert a raw reply value into message content.
    ///
    /// Strings and part lists keep their shape. `null` becomes empty text and any
    /// other JSON value is kept as its JSON text so the history stays lossless.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => MessageContent::Text(s.clone()),
            Value::Null => MessageContent::default(),
            Value::Array(_) => serde_json::from_value(value.clone())
                .map(MessageContent::Parts)
                .unwrap_or_else(|_| MessageContent::Text(value.to_string())),
            other => MessageContent::Text(other.to_string()),
        }
    }
}

/// A single part of a multipart message.
///
/// Parts of any other `type` are kept verbatim in `Other`.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// Image reference, a `data:` URI for local attachments.
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    #[serde(untagged)]
    Other(Value),
}

impl<'de> Deserialize<'de> for ContentPart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let part = match value.get("type").and_then(Value::as_str) {
            Some("text") => value.get("text").and_then(Value::as_str).map(ContentPart::text),
            Some("image_url") => value
                .get("image_url")
                .and_then(|image| image.get("url"))
                .and_then(Value::as_str)
                .map(ContentPart::image),
            _ => None,
        };
        Ok(part.unwrap_or(ContentPart::Other(value)))
    }
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// Image URL payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

// ─────────────────────────────────────────────
// Wire types (chat completions API)
// ─────────────────────────────────────────────

/// A message as sent on the wire: role and content only.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: Role,
    pub content: &'a MessageContent,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        WireMessage {
            role: msg.role,
            content: &msg.content,
        }
    }
}

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
}

/// Response body of `GET /v1/models`. Entries are kept raw so malformed ones
/// can be filtered instead of failing the whole listing.
#[derive(Debug, Default, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ModelList {
    /// String ids of object entries, in listing order.
    pub fn ids(self) -> Vec<String> {
        self.data
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

// ─────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────

/// A persisted conversation: connection settings plus the message history.
///
/// On disk the fields are named `api_url`, `api_key`, `model`, `messages`.
/// The credential is stored in plaintext.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(rename = "api_url", default)]
    pub endpoint: String,
    #[serde(rename = "api_key", default)]
    pub credential: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("credential", &crate::utils::mask_secret(&self.credential))
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .finish()
    }
}

impl Session {
    /// Create a new empty session with the given connection settings.
    pub fn new(
        endpoint: impl Into<String>,
        credential: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Session {
            endpoint: endpoint.into(),
            credential: credential.into(),
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// A fresh session with the same settings and no messages.
    pub fn fresh(&self) -> Self {
        Session::new(&self.endpoint, &self.credential, &self.model)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_text_message_serialization() {
        let msg = Message::user("Hello, world!");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello, world!");
        assert!(json.get("time").is_none());
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_user_multipart_message_serialization() {
        let msg = Message::user_parts(vec![
            ContentPart::text("What's in this image?"),
            ContentPart::image("data:image/jpeg;base64,abc123"),
        ]);
        let json = serde_json::to_value(&msg).unwrap();

        let content = json["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "What's in this image?");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,abc123");
    }

    #[test]
    fn test_assistant_reply_carries_metadata() {
        let msg = Message::assistant_reply(MessageContent::Text("hi".into()), "gpt-4o");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["time"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_message_missing_keys_default() {
        let msg: Message = serde_json::from_value(json!({})).unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, MessageContent::Text(String::new()));
    }

    #[test]
    fn test_wire_message_drops_metadata() {
        let msg = Message::assistant_reply(MessageContent::Text("ok".into()), "o4-mini");
        let request = ChatCompletionRequest {
            model: "o4-mini",
            messages: vec![WireMessage::from(&msg)],
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "o4-mini");
        assert_eq!(json["messages"][0], json!({"role": "assistant", "content": "ok"}));
    }

    #[test]
    fn test_content_from_value() {
        assert_eq!(
            MessageContent::from_value(&json!("text")),
            MessageContent::Text("text".into())
        );
        assert_eq!(
            MessageContent::from_value(&Value::Null),
            MessageContent::Text(String::new())
        );
        assert_eq!(
            MessageContent::from_value(&json!([{"type": "text", "text": "a"}])),
            MessageContent::Parts(vec![ContentPart::text("a")])
        );
        assert_eq!(
            MessageContent::from_value(&json!(42)),
            MessageContent::Text("42".into())
        );
    }

    #[test]
    fn test_message_null_content_is_empty() {
        let msg: Message =
            serde_json::from_value(json!({"role": "assistant", "content": null})).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, MessageContent::default());
    }

    #[test]
    fn test_unknown_part_type_kept_verbatim() {
        let raw = json!([
            {"type": "text", "text": "listen"},
            {"type": "input_audio", "input_audio": {"data": "AAAA", "format": "wav"}}
        ]);
        let msg: Message = serde_json::from_value(json!({"role": "user", "content": raw})).unwrap();

        match &msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts[0], ContentPart::text("listen"));
                assert!(matches!(parts[1], ContentPart::Other(_)));
            }
            other => panic!("expected parts, got {other:?}"),
        }
        assert_eq!(serde_json::to_value(&msg).unwrap()["content"], raw);
    }

    #[test]
    fn test_model_list_filters_non_string_ids() {
        let list: ModelList = serde_json::from_value(json!({
            "data": [{"id": "gpt-4o"}, {"id": 7}, "gpt-3.5", {"object": "model"}, {"id": "o4-mini"}]
        }))
        .unwrap();
        assert_eq!(list.ids(), vec!["gpt-4o", "o4-mini"]);
    }

    #[test]
    fn test_session_json_field_names() {
        let mut session = Session::new("https://api.example.com/v1/chat/completions", "sk-1", "gpt-4o");
        session.push(Message::user("Hello"));
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["api_url"], "https://api.example.com/v1/chat/completions");
        assert_eq!(json["api_key"], "sk-1");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_session_debug_masks_credential() {
        let session = Session::new("u", "sk-secret-value-123", "m");
        let debug = format!("{session:?}");
        assert!(!debug.contains("sk-secret-value-123"));
    }

    #[test]
    fn test_fresh_keeps_settings() {
        let mut session = Session::new("u", "k", "m");
        session.push(Message::user("x"));
        let fresh = session.fresh();
        assert_eq!(fresh.endpoint, "u");
        assert_eq!(fresh.credential, "k");
        assert!(fresh.messages.is_empty());
    }
}
