//! Conversation entries as kept in a chat's working history.

use serde::{Deserialize, Serialize};

/// Speaker name used for assistant turns in reconstructed history.
pub const ASSISTANT_NAME: &str = "AI";

/// Which side of the conversation an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry of a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Who said it: the user id for user turns, [`ASSISTANT_NAME`] for replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Tag the entry with its speaker.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "ok"}));

        let value = serde_json::to_value(Message::user("hi").with_name("alice")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi", "name": "alice"}));
    }
}
