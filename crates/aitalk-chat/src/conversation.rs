//! Conversation state: the session being chatted in and the unsent draft.
//!
//! Transitions:
//! - `attach` puts an image in the draft (replacing any previous one);
//! - `compose` turns text + draft into a user message and clears the draft;
//! - `reset` / `replace` start over with a fresh or loaded session and clear the draft.

use aitalk_core::attachment::PendingImage;
use aitalk_core::types::{ContentPart, Message, Session};

/// Input not yet sent: currently just an optional image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    image: Option<PendingImage>,
}

impl Draft {
    /// Attach an image, returning the one it replaced.
    pub fn attach(&mut self, image: PendingImage) -> Option<PendingImage> {
        self.image.replace(image)
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.image.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }

    fn take_image(&mut self) -> Option<PendingImage> {
        self.image.take()
    }

    fn clear(&mut self) {
        self.image = None;
    }
}

/// The session being chatted in plus its draft.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    session: Session,
    draft: Draft,
}

impl Conversation {
    pub fn new(session: Session) -> Self {
        Conversation {
            session,
            draft: Draft::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.session.model = model.into();
    }

    /// Build the next user message from `text` and the draft.
    ///
    /// Returns `None` (leaving the draft untouched) when there is nothing to send.
    /// With an image pending the content is a part list `[text?, image]`,
    /// otherwise a plain string.
    pub fn compose(&mut self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() && self.draft.is_empty() {
            return None;
        }

        let message = match self.draft.take_image() {
            Some(image) => {
                let mut parts = Vec::with_capacity(2);
                if !text.is_empty() {
                    parts.push(ContentPart::text(text));
                }
                parts.push(ContentPart::image(image.data_uri));
                Message::user_parts(parts)
            }
            None => Message::user(text),
        };
        Some(message)
    }

    pub fn append(&mut self, message: Message) {
        self.session.push(message);
    }

    /// Immutable copy of the history, handed to request workers.
    pub fn snapshot(&self) -> Vec<Message> {
        self.session.messages.clone()
    }

    /// Start a fresh session with the same connection settings.
    pub fn reset(&mut self) {
        self.session = self.session.fresh();
        self.draft.clear();
    }

    /// Swap in a loaded session.
    pub fn replace(&mut self, session: Session) {
        self.session = session;
        self.draft.clear();
    }
}
