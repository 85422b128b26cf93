//! Chat controller — owns the conversation and runs at most one request at a time.
//!
//! `send` appends the user turn and spawns a tokio task holding an immutable
//! snapshot of the history. Until `wait_reply` has joined that task and
//! appended the answer, every operation that touches the history fails with
//! [`ChatError::Busy`]. Failures never escape as panics; the caller turns them
//! into transcript notices.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use aitalk_core::attachment::{self, AttachmentError};
use aitalk_core::filter::{display_content, extract_clean_content};
use aitalk_core::session::{SessionStore, StoreError};
use aitalk_core::types::{Message, MessageContent, Role, Session};
use aitalk_providers::{ChatProvider, ChatReply, ChatSettings, ProviderError};

use crate::conversation::Conversation;

// ─────────────────────────────────────────────
// Transcript entries
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    Notice,
}

/// One line of rendered transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub text: String,
}

impl TranscriptEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { kind: EntryKind::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { kind: EntryKind::Assistant, text: text.into() }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self { kind: EntryKind::Notice, text: text.into() }
    }
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntryKind::User => write!(f, "You: {}", self.text),
            EntryKind::Assistant => write!(f, "AI: {}", self.text),
            EntryKind::Notice => write!(f, "[{}]", self.text),
        }
    }
}

/// Render stored messages through the transcript filter, skipping those with
/// nothing to show. System turns are labelled like assistant turns.
pub fn render_history(messages: &[Message]) -> Vec<TranscriptEntry> {
    messages
        .iter()
        .filter_map(|msg| {
            let text = display_content(&msg.content)?;
            Some(match msg.role {
                Role::User => TranscriptEntry::user(text),
                Role::Assistant | Role::System => TranscriptEntry::assistant(text),
            })
        })
        .collect()
}

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("a request is still in progress")]
    Busy,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("request worker failed: {0}")]
    Worker(String),
}

// ─────────────────────────────────────────────
// ChatController
// ─────────────────────────────────────────────

struct InFlight {
    model: String,
    handle: JoinHandle<Result<ChatReply, ProviderError>>,
}

/// Single writer of a [`Conversation`].
pub struct ChatController {
    conversation: Conversation,
    provider: Arc<dyn ChatProvider>,
    store: SessionStore,
    system_prompt: Option<String>,
    vision_models: Vec<String>,
    in_flight: Option<InFlight>,
}

impl ChatController {
    pub fn new(
        session: Session,
        provider: Arc<dyn ChatProvider>,
        store: SessionStore,
        system_prompt: Option<String>,
        vision_models: Vec<String>,
    ) -> Self {
        ChatController {
            conversation: Conversation::new(session),
            provider,
            store,
            system_prompt,
            vision_models,
            in_flight: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Whether a request has been dispatched and its reply not yet recorded.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Connection settings for the current session.
    pub fn settings(&self) -> ChatSettings {
        ChatSettings::from_session(self.conversation.session(), self.system_prompt.as_deref())
    }

    fn ensure_idle(&self) -> Result<(), ChatError> {
        if self.is_busy() {
            Err(ChatError::Busy)
        } else {
            Ok(())
        }
    }

    /// Append a user turn and dispatch it.
    ///
    /// Returns the echo line for the transcript, or `None` if there was
    /// nothing to send.
    pub fn send(&mut self, text: &str) -> Result<Option<TranscriptEntry>, ChatError> {
        self.ensure_idle()?;

        let image_name = self
            .conversation
            .draft()
            .pending_image()
            .map(|img| img.file_name.clone());
        let Some(message) = self.conversation.compose(text) else {
            return Ok(None);
        };
        self.conversation.append(message);

        let settings = self.settings();
        let snapshot = self.conversation.snapshot();
        let provider = Arc::clone(&self.provider);
        let model = settings.model.clone();

        debug!(
            provider = self.provider.display_name(),
            model = %model,
            messages = snapshot.len(),
            "dispatching chat request"
        );
        let handle = tokio::spawn(async move { provider.chat(&settings, &snapshot).await });
        self.in_flight = Some(InFlight { model, handle });

        let text = text.trim();
        let echo = match image_name {
            Some(name) if text.is_empty() => format!("[image: {name}]"),
            Some(name) => format!("{text} [image: {name}]"),
            None => text.to_string(),
        };
        Ok(Some(TranscriptEntry::user(echo)))
    }

    /// Wait for the outstanding request and record its reply.
    ///
    /// Returns `None` if nothing was in flight or the reply has nothing to
    /// display; errors come back as notices.
    pub async fn wait_reply(&mut self) -> Option<TranscriptEntry> {
        let InFlight { model, handle } = self.in_flight.take()?;

        match handle.await {
            Ok(Ok(reply)) => {
                let display = extract_clean_content(&reply.content);
                self.conversation.append(Message::assistant_reply(
                    MessageContent::from_value(&reply.content),
                    model,
                ));
                if display.is_none() {
                    debug!("reply has no displayable content");
                }
                display.map(TranscriptEntry::assistant)
            }
            Ok(Err(e)) => {
                error!(error = %e, "chat request failed");
                Some(TranscriptEntry::notice(format!("error: {e}")))
            }
            Err(e) => {
                let err = ChatError::Worker(e.to_string());
                error!(error = %err, "chat worker did not finish");
                Some(TranscriptEntry::notice(format!("exception: {err}")))
            }
        }
    }

    /// Put an image in the draft; it is sent with the next message.
    pub fn attach_image(&mut self, path: &Path) -> Result<TranscriptEntry, ChatError> {
        attachment::ensure_vision_model(&self.conversation.session().model, &self.vision_models)?;
        let image = attachment::encode_image(path)?;
        let name = image.file_name.clone();
        if let Some(previous) = self.conversation.draft_mut().attach(image) {
            debug!(replaced = %previous.file_name, "replaced pending image");
        }
        Ok(TranscriptEntry::notice(format!(
            "attached {name}; it will be sent with the next message"
        )))
    }

    pub fn set_model(&mut self, model: &str) -> Result<TranscriptEntry, ChatError> {
        self.ensure_idle()?;
        self.conversation.set_model(model);
        Ok(TranscriptEntry::notice(format!("model set to {model}")))
    }

    /// Drop the current history and start over with the same settings.
    pub fn new_session(&mut self) -> Result<TranscriptEntry, ChatError> {
        self.ensure_idle()?;
        self.conversation.reset();
        Ok(TranscriptEntry::notice("new conversation started"))
    }

    /// Save the session and start a fresh one. Returns the filename written.
    pub fn save(&mut self, base_name: &str) -> Result<String, ChatError> {
        self.ensure_idle()?;
        let filename = self.store.save(base_name, self.conversation.session())?;
        info!(file = %filename, "session saved");
        self.conversation.reset();
        Ok(filename)
    }

    /// Replace the session with a saved one and render its history.
    pub fn load(&mut self, filename: &str) -> Result<Vec<TranscriptEntry>, ChatError> {
        self.ensure_idle()?;
        let session = self.store.load(filename)?;
        info!(file = %filename, messages = session.messages.len(), "session loaded");
        self.conversation.replace(session);

        let mut entries = vec![TranscriptEntry::notice(format!("loaded conversation: {filename}"))];
        entries.extend(render_history(&self.conversation.session().messages));
        Ok(entries)
    }

    pub fn list_sessions(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.store.list()?)
    }

    /// Ask the endpoint which models it serves.
    pub async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.provider.list_models(&self.settings()).await?)
    }

    /// The current history, rendered.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        render_history(&self.conversation.session().messages)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
