//! Per-request working context.

use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageRole};

/// State of one conversational request.
///
/// Built by the caller for every inbound message and threaded by `&mut`
/// through the resolver, the episodic write and the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Caller identity.
    pub user_id: String,
    /// Chat the turn belongs to, once resolved.
    pub chat_id: Option<String>,
    /// The user's message for this turn.
    pub user_text: String,
    /// Conversation so far, oldest first.
    pub history: Vec<Message>,
}

impl ChatContext {
    /// Context for a new turn.
    pub fn new(user_id: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_text: user_text.into(),
            ..Default::default()
        }
    }

    /// Bind the turn to an explicit chat.
    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Seed the working history.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Append a user message spoken by this context's user.
    pub fn push_user(&mut self, text: impl Into<String>) {
        let message = Message::user(text).with_name(self.user_id.clone());
        self.history.push(message);
    }

    /// Append an assistant reply.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.history
            .push(Message::assistant(text).with_name(crate::types::ASSISTANT_NAME));
    }

    /// Number of user turns in the working history.
    pub fn user_turns(&self) -> usize {
        self.history
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }
}
