//! Logging trait for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`DeepSeek`](crate::DeepSeek) client.

use crate::{ChatCompletionChunk, ChatCompletionRequest, Error};

/// A trait for logging completion client operations.
///
/// Implement this trait to capture and record all API interactions, including the outbound
/// request body, every streamed chunk and the error that ended a stream.
///
/// # Example
///
/// ```rust,ignore
/// use seekchat::{ChatCompletionChunk, ChatCompletionRequest, ClientLogger, Error};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_chunk(&self, chunk: &ChatCompletionChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
///
///     fn log_error(&self, error: &Error) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Error: {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log the body of a request just before it is sent.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log an individual streamed chunk, in arrival order.
    fn log_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log an error returned by the server or raised while streaming.
    fn log_error(&self, error: &Error);
}
