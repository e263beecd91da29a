//! The contract between the session controller and whatever talks to the model.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

/// A lazy, finite sequence of response chunks.
///
/// The sequence ends normally after the terminal chunk (`None`), or yields a single `Err`
/// describing why it failed.  Chunks already yielded before a failure stay yielded; there is no
/// other partial-success signal.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Something that can turn a chat completion request into a stream of chunks.
///
/// Implementations own HTTP, TLS, authentication, serialization and timeouts.  Dropping the
/// returned stream must stop the underlying read.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Issue the request and return the chunk stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be started, e.g. the connection failed or
    /// the server answered with an error status.
    async fn stream_chat_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream>;
}

#[async_trait::async_trait]
impl<T: CompletionTransport + ?Sized> CompletionTransport for std::sync::Arc<T> {
    async fn stream_chat_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        (**self).stream_chat_completion(request).await
    }
}

#[async_trait::async_trait]
impl<T: CompletionTransport + ?Sized> CompletionTransport for Box<T> {
    async fn stream_chat_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        (**self).stream_chat_completion(request).await
    }
}
