//! Append-only conversation log.
//!
//! [`ConversationStore`] is the single source of truth replayed to the model
//! on every round. Messages are only ever appended; there is no API to edit
//! or remove one.

use crate::message::{ChatMessage, Message};

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a previously recorded transcript.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Builds the `{role, content}` request body: the preamble as a system
    /// message followed by every stored message in append order.
    pub fn flatten(&self, preamble: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(preamble))
            .chain(self.messages.iter().map(ChatMessage::from))
            .collect()
    }
}
