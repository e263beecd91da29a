use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point or a stop sequence.
    Stop,

    /// The completion hit the max tokens limit.
    Length,

    /// Output was withheld by the content filter.
    ContentFilter,

    /// The model called a tool.
    ToolCalls,

    /// The request was interrupted because the server ran out of resources.
    InsufficientSystemResource,

    /// A reason this crate does not know about.
    #[serde(other)]
    Other,
}

/// The incremental part of a streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// The role, usually only present on the first chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// New text to append to the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// New chain-of-thought text from a reasoning model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// One choice within a streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The index of this choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the last chunk of this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// One incremental unit of a streaming chat completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// The completion this chunk belongs to.
    #[serde(default)]
    pub id: String,

    /// The model producing the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Unix timestamp of the completion's creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,

    /// Zero or more choices; the session controller only reads the first.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Token usage, typically present only on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// A chunk carrying a single text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.into()),
                    ..ChunkDelta::default()
                },
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// A chunk carrying a single reasoning delta.
    pub fn reasoning(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    reasoning_content: Some(content.into()),
                    ..ChunkDelta::default()
                },
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// A chunk with no choices that only reports usage.
    pub fn usage_only(usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..Self::default()
        }
    }

    /// Attach a usage snapshot.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Mark the first choice as finished.
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        if let Some(choice) = self.choices.first_mut() {
            choice.finish_reason = Some(reason);
        }
        self
    }

    /// The non-empty text delta of the first choice, if any.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    /// The non-empty reasoning delta of the first choice, if any.
    pub fn delta_reasoning(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.reasoning_content.as_deref())
            .filter(|text| !text.is_empty())
    }

    /// The finish reason of the first choice, if any.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_ref())
    }
}
