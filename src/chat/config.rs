//! Session settings and the flags that produce them.
//!
//! [`ChatArgs`] is what `arrrg` parses off the command line; [`ChatConfig`] is what the
//! session controller reads.

use arrrg_derive::CommandLine;

use crate::chat::commands::{check_max_tokens, parse_temperature};
use crate::types::{KnownModel, Model};
use crate::{Error, Result};

/// Seeded as the first message of every conversation unless overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Respond in the same language as the user.";

const DEFAULT_MAX_TOKENS: u32 = 1000;

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Flags accepted by `seekchat`.  Every value is optional; see [`ChatConfig::new`].
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model name; unrecognized names are sent verbatim.
    #[arrrg(optional, "Model to use (default: deepseek-chat)", "MODEL")]
    pub model: Option<String>,

    /// Replaces the default system prompt.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Must be positive.
    #[arrrg(optional, "Max tokens per response (default: 1000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Kept as text so the struct stays `Eq`; parsed and range-checked on conversion.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Any OpenAI-compatible endpoint works here.
    #[arrrg(optional, "API base URL (default: https://api.deepseek.com/)", "URL")]
    pub base_url: Option<String>,

    /// Print plain text without ANSI styling.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Start with the usage line hidden.
    #[arrrg(flag, "Do not print token usage after responses")]
    pub no_usage: bool,
}

/// Resolved settings for one
/// [`StreamingSessionController`](crate::chat::StreamingSessionController).
///
/// `model`, `max_tokens` and `temperature` go into every request as-is; nothing here is
/// validated against what the endpoint accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Model named in each request.
    pub model: Model,

    /// Takes effect on the next reseed (construction or clear).
    pub system_prompt: String,

    /// Upper bound on tokens per reply.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// `None` uses the DeepSeek default.
    pub base_url: Option<String>,

    /// Whether the renderer may emit ANSI styles.
    pub use_color: bool,

    /// Whether the REPL prints usage after each reply.
    pub show_usage: bool,
}

impl ChatConfig {
    /// `deepseek-chat`, 1000 tokens, temperature 0.7, color and usage on.
    pub fn new() -> Self {
        Self {
            model: Model::Known(KnownModel::DeepseekChat),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
            use_color: true,
            show_usage: true,
        }
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    pub fn with_usage_display(mut self, show_usage: bool) -> Self {
        self.show_usage = show_usage;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects the same values the `/max_tokens` and `/temperature` commands reject.
impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new()
            .with_base_url(args.base_url)
            .with_usage_display(!args.no_usage);
        if let Some(name) = args.model {
            config.model = name.parse().unwrap_or(Model::Custom(name));
        }
        if let Some(prompt) = args.system {
            config.system_prompt = prompt;
        }
        if let Some(max_tokens) = args.max_tokens {
            config.max_tokens = check_max_tokens(max_tokens).map_err(|err| {
                Error::validation(
                    format!("--max-tokens {err}"),
                    Some("max_tokens".to_string()),
                )
            })?;
        }
        if let Some(temperature) = args.temperature {
            config.temperature = parse_temperature(&temperature).map_err(|err| {
                Error::validation(
                    format!("--temperature {err}"),
                    Some("temperature".to_string()),
                )
            })?;
        }
        if args.no_color {
            config = config.without_color();
        }
        Ok(config)
    }
}
