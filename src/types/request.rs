use serde::{Deserialize, Serialize};

use crate::types::{Message, Model};

/// Options that only apply to streaming requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Ask the server to send a usage snapshot before `[DONE]`.
    pub include_usage: bool,
}

/// The body of a streaming chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The conversation so far, system message included.
    pub messages: Vec<Message>,

    /// The model to complete with.
    pub model: Model,

    /// The maximum number of tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature, typically between 0.0 and 2.0.
    pub temperature: f32,

    /// Always true for requests made by the session controller.
    pub stream: bool,

    /// Streaming options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

impl ChatCompletionRequest {
    /// Create a streaming request that asks for usage on the final chunk.
    pub fn streaming(
        messages: Vec<Message>,
        model: Model,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            messages,
            model,
            max_tokens,
            temperature,
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn streaming_request_body() {
        let request = ChatCompletionRequest::streaming(
            vec![Message::system("Be terse."), Message::user("Hi")],
            Model::Known(KnownModel::DeepseekChat),
            1000,
            0.5,
        );

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "messages": [
                    {"role": "system", "content": "Be terse."},
                    {"role": "user", "content": "Hi"}
                ],
                "model": "deepseek-chat",
                "max_tokens": 1000,
                "temperature": 0.5,
                "stream": true,
                "stream_options": {"include_usage": true}
            })
        );
    }
}
