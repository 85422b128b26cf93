//! HTTP chat provider for OpenAI-compatible APIs.
//!
//! - Chat: `POST {endpoint}` with `{"model", "messages"}` and a bearer token.
//! - Models: `GET {base}/v1/models`.
//!
//! The HTTP status is not trusted on its own: success is a JSON body with a
//! `choices` key, anything else is an error whose text comes from
//! `error.message` when the API provides one.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use aitalk_core::types::{ChatCompletionRequest, Message, ModelList, WireMessage};

use crate::traits::{ChatProvider, ChatReply, ChatSettings, ProviderError};

/// Error text used when an error response carries no `error.message`.
pub const GENERIC_API_ERROR: &str = "API returned an unexpected response format";

/// Longest slice of a non-JSON body quoted in an error.
const BODY_PREVIEW_CHARS: usize = 200;

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A chat provider that talks to any OpenAI-compatible HTTP API.
#[derive(Clone, Debug)]
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
}

impl HttpProvider {
    /// Create a provider. `timeout` of `None` lets requests run unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpProvider {
            client: builder.build()?,
        })
    }

    /// Create a provider from a timeout in seconds, where `0` disables the timeout.
    pub fn with_timeout_secs(secs: u64) -> Result<Self, ProviderError> {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }
}

#[async_trait]
impl ChatProvider for HttpProvider {
    async fn chat(&self, settings: &ChatSettings, messages: &[Message]) -> Result<ChatReply, ProviderError> {
        let persona = settings.system_prompt.as_deref().map(Message::system);

        let mut wire: Vec<WireMessage<'_>> = Vec::with_capacity(messages.len() + 1);
        if let Some(ref system) = persona {
            wire.push(WireMessage::from(system));
        }
        wire.extend(messages.iter().map(WireMessage::from));

        let request_body = ChatCompletionRequest {
            model: &settings.model,
            messages: wire,
        };

        debug!(
            endpoint = %settings.endpoint,
            model = %settings.model,
            messages = request_body.messages.len(),
            "Calling chat API"
        );

        let response = self
            .client
            .post(&settings.endpoint)
            .bearer_auth(&settings.credential)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %settings.endpoint, error = %e, "HTTP request failed");
                ProviderError::Transport(e)
            })?;

        let status = response.status();
        let body = read_json(response).await?;
        let reply = parse_chat_body(body)?;

        debug!(status = %status, "Chat reply received");
        Ok(reply)
    }

    async fn list_models(&self, settings: &ChatSettings) -> Result<Vec<String>, ProviderError> {
        let url = models_url(&settings.endpoint);
        debug!(url = %url, "Listing models");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&settings.credential)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "HTTP request failed");
                ProviderError::Transport(e)
            })?;

        let body = read_json(response).await?;
        if body.get("data").is_none() {
            return Err(api_error(&body));
        }

        let list: ModelList =
            serde_json::from_value(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(list.ids())
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// Response handling
// ─────────────────────────────────────────────

async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        error!(status = %status, error = %e, "Response is not JSON");
        let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
        ProviderError::Malformed(format!("HTTP {status}: {preview}"))
    })
}

/// Pull `choices[0].message.content` out of a chat completion body.
fn parse_chat_body(body: Value) -> Result<ChatReply, ProviderError> {
    let Some(choices) = body.get("choices") else {
        let err = api_error(&body);
        error!(error = %err, "Chat API returned an error");
        return Err(err);
    };

    let message = choices
        .get(0)
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProviderError::Malformed("no message in choices".to_string()))?;

    Ok(ChatReply {
        content: message.get("content").cloned().unwrap_or(Value::Null),
    })
}

/// Build the error for a body without the expected payload key.
fn api_error(body: &Value) -> ProviderError {
    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(GENERIC_API_ERROR);
    ProviderError::Api(message.to_string())
}

/// Model listing URL for a chat endpoint.
///
/// Uses the part of the endpoint before `/v1/` when present (so path-prefixed
/// proxies keep their prefix), otherwise the endpoint's origin.
pub fn models_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let base = if let Some(idx) = endpoint.find("/v1/") {
        endpoint[..idx].to_string()
    } else if let Some(stripped) = endpoint.strip_suffix("/v1") {
        stripped.to_string()
    } else {
        match reqwest::Url::parse(endpoint) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => endpoint.to_string(),
        }
    };
    format!("{base}/v1/models")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aitalk_core::types::{ContentPart, MessageContent};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(endpoint: String) -> ChatSettings {
        ChatSettings {
            endpoint,
            credential: "test-key-123".to_string(),
            model: "gpt-4o".to_string(),
            system_prompt: None,
        }
    }

    fn provider() -> HttpProvider {
        HttpProvider::with_timeout_secs(30).unwrap()
    }

    // ── models_url ──

    #[test]
    fn test_models_url_from_chat_endpoint() {
        assert_eq!(
            models_url("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1/models"
        );
    }

    #[test]
    fn test_models_url_keeps_path_prefix() {
        assert_eq!(
            models_url("https://proxy.example.com/openai/v1/chat/completions"),
            "https://proxy.example.com/openai/v1/models"
        );
    }

    #[test]
    fn test_models_url_bare_v1() {
        assert_eq!(models_url("http://localhost:11434/v1/"), "http://localhost:11434/v1/models");
    }

    #[test]
    fn test_models_url_without_version_uses_origin() {
        assert_eq!(
            models_url("http://127.0.0.1:8000/api/chat"),
            "http://127.0.0.1:8000/v1/models"
        );
    }

    // ── parse_chat_body ──

    #[test]
    fn test_parse_chat_body_structured_content() {
        let body = json!({"choices": [{"message": {"content": [{"type": "text", "text": "hi"}]}}]});
        let reply = parse_chat_body(body).unwrap();
        assert!(reply.content.is_array());
    }

    #[test]
    fn test_parse_chat_body_empty_choices() {
        let err = parse_chat_body(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_api_error_fallback() {
        let err = api_error(&json!({"detail": "nope"}));
        assert_eq!(err.to_string(), GENERIC_API_ERROR);
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_chat_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "message": { "role": "assistant", "content": "Hello!" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&mock_server)
            .await;

        let settings = settings(format!("{}/v1/chat/completions", mock_server.uri()));
        let reply = provider()
            .chat(&settings, &[Message::user("Hi")])
            .await
            .unwrap();

        assert_eq!(reply.content, json!("Hello!"));
    }

    #[tokio::test]
    async fn test_chat_sends_exact_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_json(json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": [
                        {"type": "text", "text": "what?"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AA=="}}
                    ]},
                    {"role": "assistant", "content": "a cat"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&mock_server)
            .await;

        let mut settings = settings(format!("{}/v1/chat/completions", mock_server.uri()));
        settings.system_prompt = Some("You are terse.".to_string());

        let history = vec![
            Message::user_parts(vec![
                ContentPart::text("what?"),
                ContentPart::image("data:image/jpeg;base64,AA=="),
            ]),
            // time/model metadata must not reach the wire
            Message::assistant_reply(MessageContent::Text("a cat".into()), "gpt-4o"),
        ];

        let reply = provider().chat(&settings, &history).await.unwrap();
        assert_eq!(reply.content, json!("ok"));
    }

    #[tokio::test]
    async fn test_chat_api_error_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&mock_server)
            .await;

        let err = provider()
            .chat(&settings(mock_server.uri()), &[Message::user("Hi")])
            .await
            .unwrap_err();

        match err {
            ProviderError::Api(msg) => assert_eq!(msg, "Incorrect API key provided"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_error_without_message_uses_fallback() {
        let mock_server = MockServer::start().await;

        // A 200 without `choices` is still an error.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .mount(&mock_server)
            .await;

        let err = provider()
            .chat(&settings(mock_server.uri()), &[Message::user("Hi")])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), GENERIC_API_ERROR);
    }

    #[tokio::test]
    async fn test_chat_non_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&mock_server)
            .await;

        let err = provider()
            .chat(&settings(mock_server.uri()), &[Message::user("Hi")])
            .await
            .unwrap_err();

        match err {
            ProviderError::Malformed(msg) => {
                assert!(msg.contains("502"));
                assert!(msg.contains("Bad Gateway"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_network_error() {
        // Point to a port that's not listening
        let err = provider()
            .chat(&settings("http://127.0.0.1:1/v1/chat/completions".into()), &[Message::user("Hi")])
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_chat_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let provider = HttpProvider::new(Some(Duration::from_millis(200))).unwrap();
        let err = provider
            .chat(&settings(mock_server.uri()), &[Message::user("Hi")])
            .await
            .unwrap_err();

        match err {
            ProviderError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_models_skips_malformed_entries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"id": "gpt-4o", "object": "model"},
                    {"id": 42, "object": "model"},
                    {"id": null},
                    "gpt-3.5-turbo",
                    {"id": "o4-mini", "object": "model"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let settings = settings(format!("{}/v1/chat/completions", mock_server.uri()));
        let models = provider().list_models(&settings).await.unwrap();

        assert_eq!(models, vec!["gpt-4o", "o4-mini"]);
    }

    #[tokio::test]
    async fn test_list_models_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"message": "forbidden"}
            })))
            .mount(&mock_server)
            .await;

        let settings = settings(format!("{}/v1/chat/completions", mock_server.uri()));
        let err = provider().list_models(&settings).await.unwrap_err();

        assert_eq!(err.to_string(), "forbidden");
    }
}
