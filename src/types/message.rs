use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The role a [`Message`] plays in the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,

    /// System role.
    System,

    /// Tool role.
    Tool,
}

impl MessageRole {
    /// The lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        }
    }
}

/// One turn in a conversation, tagged by role.
///
/// Serializes to the OpenAI-compatible wire shape used by DeepSeek, e.g.
/// `{"role": "user", "content": "Hello"}`; absent optional fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// A message written by the user.
    User {
        /// The text of the message.
        content: String,

        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// A message produced by the model.
    Assistant {
        /// The text of the message.
        content: String,

        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,

        /// Ask the model to continue from this message (prefix completion).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<bool>,

        /// Chain-of-thought text from a reasoning model.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },

    /// Instructions that frame the conversation.
    System {
        /// The text of the message.
        content: String,

        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// The result of a tool call.
    Tool {
        /// The text of the message.
        content: String,

        /// The tool call this message answers.
        tool_call_id: String,
    },
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
            name: None,
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            name: None,
            prefix: None,
            reasoning_content: None,
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
            name: None,
        }
    }

    /// Create a new tool message.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Set the participant name.  Tool messages carry no name and are returned unchanged.
    pub fn with_name(mut self, new_name: impl Into<String>) -> Self {
        match &mut self {
            Message::User { name, .. }
            | Message::Assistant { name, .. }
            | Message::System { name, .. } => *name = Some(new_name.into()),
            Message::Tool { .. } => {}
        }
        self
    }

    /// The role of this message.
    pub fn role(&self) -> MessageRole {
        match self {
            Message::User { .. } => MessageRole::User,
            Message::Assistant { .. } => MessageRole::Assistant,
            Message::System { .. } => MessageRole::System,
            Message::Tool { .. } => MessageRole::Tool,
        }
    }

    /// The text content of this message.
    pub fn content(&self) -> &str {
        match self {
            Message::User { content, .. }
            | Message::Assistant { content, .. }
            | Message::System { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// True for system messages.
    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    /// A deterministic identity derived from the role, the content and the auxiliary fields.
    ///
    /// Identical messages share an identity; see
    /// [`ConversationStore::keyed`](crate::chat::ConversationStore::keyed) for identities that
    /// are unique within a conversation.
    pub fn id(&self) -> String {
        match self {
            Message::User { content, name } => {
                format!("user_{:016x}_{}", content_hash(content), or_empty(name))
            }
            Message::Assistant {
                content,
                name,
                prefix,
                reasoning_content,
            } => format!(
                "assistant_{:016x}_{}_{}_{}",
                content_hash(content),
                or_empty(name),
                prefix.map(|p| p.to_string()).unwrap_or_default(),
                or_empty(reasoning_content),
            ),
            Message::System { content, name } => {
                format!("system_{:016x}_{}", content_hash(content), or_empty(name))
            }
            Message::Tool {
                content,
                tool_call_id,
            } => format!("tool_{:016x}_{}", content_hash(content), tool_call_id),
        }
    }
}

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

fn or_empty(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}
