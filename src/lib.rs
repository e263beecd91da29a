//! A streaming chat-completion client for DeepSeek and other OpenAI-compatible APIs.
//!
//! The [`chat::StreamingSessionController`] sends a conversation through a
//! [`CompletionTransport`], folds the streamed deltas into one assistant message and
//! publishes a consistent snapshot of the session after every change.  [`DeepSeek`] is
//! the bundled transport.

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod sse;
pub mod transport;
pub mod types;

// Re-exports
pub use client::DeepSeek;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use transport::{ChunkStream, CompletionTransport};
pub use types::*;
