//! The ordered message history of one conversation.

use std::collections::HashMap;

use crate::types::Message;

/// Ordered sequence of messages; insertion order is chronological and display order.
///
/// The first message is always the `system` message holding the conversation's default
/// instructions.  It is seeded on construction and restored by [`clear`](Self::clear).  A later
/// `system` message appended by the caller is kept as an ordinary message: it is neither
/// deduplicated nor does it replace the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStore {
    system_prompt: String,
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Creates a store seeded with one system message.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let messages = vec![Message::system(system_prompt.clone())];
        Self {
            system_prompt,
            messages,
        }
    }

    /// Adds a message to the end of the conversation.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes every message, then re-seeds the default system message.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.messages
            .push(Message::system(self.system_prompt.clone()));
    }

    /// All messages in insertion order, system messages included.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Messages a presentation layer should draw: everything except system messages.
    pub fn renderable(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|message| !message.is_system())
    }

    /// Pairs every message with an identity that is unique within this conversation.
    ///
    /// The first occurrence of a message uses [`Message::id`]; repeats get `#2`, `#3`, ...
    pub fn keyed(&self) -> Vec<(String, &Message)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        self.messages
            .iter()
            .map(|message| {
                let id = message.id();
                let count = seen.entry(id.clone()).or_insert(0);
                *count += 1;
                let key = if *count == 1 {
                    id
                } else {
                    format!("{id}#{count}")
                };
                (key, message)
            })
            .collect()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The number of messages, the seeded system message included.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false once constructed; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The default instruction text.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Changes the default instruction text used by the next [`clear`](Self::clear).
    ///
    /// The system message already in the conversation is left untouched.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }
}
