//! Streaming chat sessions against an OpenAI-compatible completion endpoint.
//!
//! This module holds the conversation state and the controller that drives
//! streaming completions, plus the pieces the `seekchat` REPL is built from:
//!
//! - Streaming responses folded into a buffer and published as snapshots
//! - Cancellation of an in-flight response
//! - Slash commands for session control
//! - Configurable model, system prompt, and parameters
//!
//! # Architecture
//!
//! - [`conversation`]: the ordered message history
//! - [`usage`]: the latest token-usage snapshot
//! - [`session`]: the streaming session controller
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing
//! - [`render`]: terminal output

pub mod commands;
pub mod config;
pub mod conversation;
pub mod render;
pub mod session;
pub mod usage;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_PROMPT};
pub use conversation::ConversationStore;
pub use render::{PlainTextRenderer, Renderer, StreamPrinter, format_usage};
pub use session::{
    CancelHandle, ERROR_MESSAGE_PREFIX, SessionSnapshot, SessionState, SessionStats, StreamOutcome,
    StreamingSessionController,
};
pub use usage::UsageAggregator;
