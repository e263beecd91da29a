use serde::{Deserialize, Serialize};

/// Breakdown of the completion tokens.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionTokensDetails {
    /// The number of tokens spent on chain-of-thought reasoning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

/// Token usage reported for a completion request.
///
/// Every field is optional because providers report different subsets.  A snapshot is always
/// replaced as a whole; fields are never merged across snapshots.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// The number of tokens in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,

    /// The number of tokens in the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,

    /// Prompt plus completion tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,

    /// Details about the completion tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

impl Usage {
    /// Create a new `Usage` with the given prompt and completion tokens.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens.saturating_add(completion_tokens)),
            completion_tokens_details: None,
        }
    }

    /// Create a `Usage` carrying only a total.
    pub fn total(total_tokens: u32) -> Self {
        Self {
            total_tokens: Some(total_tokens),
            ..Self::default()
        }
    }

    /// Set the reasoning tokens.
    pub fn with_reasoning_tokens(mut self, tokens: u32) -> Self {
        self.completion_tokens_details = Some(CompletionTokensDetails {
            reasoning_tokens: Some(tokens),
        });
        self
    }

    /// The reasoning tokens, if reported.
    pub fn reasoning_tokens(&self) -> Option<u32> {
        self.completion_tokens_details
            .and_then(|details| details.reasoning_tokens)
    }
}
