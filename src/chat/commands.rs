//! `/`-prefixed commands understood by the REPL.
//!
//! Anything that does not start with a slash is a message for the model.

/// What the user asked the REPL to do.  Never forwarded to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Drop every message and reseed the system prompt.
    Clear,

    /// Switch the model used by later requests.
    Model(String),

    /// New system prompt for the next clear; `None` means the built-in default.
    System(Option<String>),

    /// Change the per-reply token limit.
    MaxTokens(u32),

    /// Change the sampling temperature.
    Temperature(f32),

    /// Turn the per-response usage line on or off.
    Usage(bool),

    /// Print the conversation so far.
    History,

    /// Print the command list.
    Help,

    /// Leave the REPL.
    Quit,

    /// Request counters and the last usage snapshot.
    Stats,

    /// Print the current settings.
    ShowConfig,

    /// The input looked like a command but could not be parsed; carries the reason.
    Invalid(String),
}

/// Interpret one line of input.
///
/// `None` means the line is an ordinary message.
///
/// ```
/// # use seekchat::chat::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(matches!(parse_command("/model deepseek-reasoner"), Some(ChatCommand::Model(_))));
/// assert!(parse_command("Hello, DeepSeek!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, Some(argument.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    let name = name.to_lowercase();

    let command = match (name.as_str(), argument) {
        ("clear" | "new", _) => ChatCommand::Clear,
        ("help" | "?", _) => ChatCommand::Help,
        ("quit" | "exit" | "q", _) => ChatCommand::Quit,
        ("stats" | "status", _) => ChatCommand::Stats,
        ("config", _) => ChatCommand::ShowConfig,
        ("history", _) => ChatCommand::History,
        ("system", argument) => ChatCommand::System(argument.map(str::to_string)),
        ("model", Some(model)) => ChatCommand::Model(model.to_string()),
        ("max_tokens", Some(arg)) => match arg.parse::<u32>() {
            Ok(value) => match check_max_tokens(value) {
                Ok(value) => ChatCommand::MaxTokens(value),
                Err(err) => invalid(format!("/max_tokens {err}")),
            },
            Err(_) => invalid(format!("/max_tokens {MAX_TOKENS_EXPECTATION}")),
        },
        ("temperature", Some(arg)) => match parse_temperature(arg) {
            Ok(value) => ChatCommand::Temperature(value),
            Err(err) => invalid(format!("/temperature {err}")),
        },
        ("usage", argument) => match argument.and_then(parse_on_off) {
            Some(show) => ChatCommand::Usage(show),
            None => invalid("/usage expects 'on' or 'off'"),
        },
        ("model", None) => invalid("/model requires a model name"),
        ("max_tokens" | "temperature", None) => invalid(format!("/{name} requires a value")),
        _ => invalid(format!("Unknown command: /{name}")),
    };
    Some(command)
}

fn invalid(reason: impl Into<String>) -> ChatCommand {
    ChatCommand::Invalid(reason.into())
}

const MAX_TOKENS_EXPECTATION: &str = "expects a positive integer";

/// Accept a token limit only if it is positive.  Shared by `/max_tokens` and `--max-tokens`.
pub(crate) fn check_max_tokens(value: u32) -> Result<u32, String> {
    if value > 0 {
        Ok(value)
    } else {
        Err(MAX_TOKENS_EXPECTATION.to_string())
    }
}

/// Parse a sampling temperature in `[0, 2]`.  Shared by `/temperature` and `--temperature`.
pub(crate) fn parse_temperature(value: &str) -> Result<f32, String> {
    parse_f32_in_range(value, 0.0, 2.0)
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// One line per command, for `/help`.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model deepseek-reasoner)
  /system [prompt]       Set the system prompt used after /clear (no argument restores the default)
  /max_tokens <n>        Set maximum response tokens
  /temperature <v>       Set temperature 0.0-2.0
  /usage on|off          Show or hide token usage after responses
  /history               Print the conversation so far
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl-C while a response is streaming to cancel it."#
}
