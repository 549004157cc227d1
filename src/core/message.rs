use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{Content, Part};

/// Who authored a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    /// Role string used by the Gemini API ("user" / "model").
    pub fn api_role(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "model",
        }
    }

    pub fn is_user(self) -> bool {
        self == Sender::User
    }

    pub fn is_bot(self) -> bool {
        self == Sender::Bot
    }
}

/// Opaque message identity, unique within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
}

/// Ordered message list, insertion order = chronological order.
///
/// The backing store is shared copy-on-write: [`Conversation::snapshot`]
/// hands out an `Arc` clone, so readers always observe a consistent view
/// while mutation goes through `Arc::make_mut`. Messages are never removed
/// within a session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Arc<Vec<Message>>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation pre-seeded with one bot message (greeting or the
    /// disabled-mode notice).
    pub fn seeded(text: &str) -> Self {
        let mut conversation = Self::new();
        conversation.push(Sender::Bot, text.to_string());
        conversation
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consistent immutable view for rendering.
    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.messages)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn push(&mut self, sender: Sender, text: String) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        Arc::make_mut(&mut self.messages).push(Message { id, text, sender });
        id
    }

    /// Append the user's turn followed by the empty bot placeholder whose
    /// presence signals "awaiting response" to the UI.
    ///
    /// Returns the placeholder's id, the handle the streaming reducer writes
    /// through for the rest of the turn.
    pub fn begin_turn(&mut self, user_text: String) -> MessageId {
        self.push(Sender::User, user_text);
        self.push(Sender::Bot, String::new())
    }

    /// Replace a message's text wholesale, matching by identity.
    ///
    /// Unknown ids are ignored; the conversation never invents messages.
    pub fn set_text(&mut self, id: MessageId, text: &str) {
        let messages = Arc::make_mut(&mut self.messages);
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.text = text.to_string();
        }
    }

    pub fn text_of(&self, id: MessageId) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.text.as_str())
    }

    /// Project prior turns into Gemini `Content` entries for the relay.
    ///
    /// Recomputed fresh on every send. An open placeholder (empty bot text)
    /// is skipped; it is the turn being answered, not history.
    pub fn history_snapshot(&self) -> Vec<Content> {
        self.messages
            .iter()
            .filter(|m| !(m.sender.is_bot() && m.text.is_empty()))
            .map(|m| Content {
                role: m.sender.api_role().to_string(),
                parts: vec![Part {
                    text: m.text.clone(),
                }],
            })
            .collect()
    }
}
