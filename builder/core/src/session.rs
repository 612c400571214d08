//! Conversation Session
//!
//! The ordered, append-only message history of one chat. A session is
//! cleared wholesale on "new chat"; individual messages are never edited
//! once appended.

use serde::{Deserialize, Serialize};

use crate::messages::{MessageId, MessageRole};

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was created (Unix timestamp ms)
    pub timestamp: u64,
}

impl ConversationMessage {
    /// Create a new message
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            timestamp: now_ms(),
        }
    }
}

/// `{role, content}` pair as sent to the generation endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `"user"` or `"assistant"`
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl From<&ConversationMessage> for ChatTurn {
    fn from(msg: &ConversationMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// A conversation session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    messages: Vec<ConversationMessage>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user message
    pub fn add_user_message(&mut self, content: String) -> &ConversationMessage {
        self.push(ConversationMessage::new(MessageRole::User, content))
    }

    /// Add an assistant message
    pub fn add_assistant_message(&mut self, content: String) -> &ConversationMessage {
        self.push(ConversationMessage::new(MessageRole::Assistant, content))
    }

    fn push(&mut self, msg: ConversationMessage) -> &ConversationMessage {
        self.messages.push(msg);
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    /// Get message by ID
    pub fn get_message(&self, id: &MessageId) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Get all messages
    pub fn all_messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Conversation history in request form
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages.iter().map(ChatTurn::from).collect()
    }

    /// Current message count
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Clear message history
    pub fn clear_history(&mut self) {
        self.messages.clear();
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
