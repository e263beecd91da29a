//! Core streaming session management.
//!
//! This module provides [`StreamingSessionController`], which owns a conversation, drives one
//! streaming completion at a time through a [`CompletionTransport`] and publishes every state
//! change as a [`SessionSnapshot`].

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::chat::config::ChatConfig;
use crate::chat::conversation::ConversationStore;
use crate::chat::usage::UsageAggregator;
use crate::error::Error;
use crate::observability::{
    SESSION_CANCELLED, SESSION_COMMITTED, SESSION_DURATION, SESSION_EMPTY, SESSION_FAILED,
    SESSION_STARTED,
};
use crate::transport::{ChunkStream, CompletionTransport};
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, Message, Model, Usage};

/// Prefix of the assistant message committed when a session fails.
pub const ERROR_MESSAGE_PREFIX: &str = "Sorry, an error occurred: ";

/// The lifecycle state of the streaming session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No request is in flight.
    #[default]
    Idle,
    /// A request is in flight and chunks are being folded into the buffer.
    Streaming,
    /// The stream ended normally and the buffer is being committed.
    Finalizing,
    /// The stream failed and the error message is being committed.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Finalizing => "finalizing",
            SessionState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// A consistent view of the session, published after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The lifecycle state.
    pub state: SessionState,
    /// Whether a streaming buffer exists.
    pub active: bool,
    /// Assistant text accumulated so far in the current session.
    pub buffer: String,
    /// Reasoning text accumulated so far; displayed only, never committed.
    pub reasoning: String,
    /// The latest usage snapshot of the current session.
    pub usage: Option<Usage>,
    /// The committed conversation.
    pub messages: Arc<[Message]>,
    /// Description of the error that ended the most recent session, if it failed.
    pub last_error: Option<String>,
}

/// What happened to one call of [`StreamingSessionController::send_streaming_message`].
///
/// Failures are already handled by the controller; this only reports them.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// The stream ended and its text was committed as an assistant message.
    Committed,
    /// The stream ended without text, so nothing was committed.
    Empty,
    /// The stream failed and a synthetic assistant message describes the error.
    Failed(Error),
    /// The session was cancelled and nothing was committed.
    Cancelled,
}

impl StreamOutcome {
    /// Returns true if an assistant message was appended to the conversation.
    pub fn appended_message(&self) -> bool {
        matches!(self, StreamOutcome::Committed | StreamOutcome::Failed(_))
    }
}

/// Cancels the in-flight session from another task or a signal handler.
///
/// Cancelling when nothing is in flight does nothing.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelHandle {
    /// Requests cancellation of the in-flight session.
    ///
    /// Returns true if a session was in flight.
    pub fn cancel(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        match current.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns true if a session is in flight.
    pub fn is_armed(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.clone());
        token
    }

    fn disarm(&self) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// Text accumulated from the deltas of one streaming session.
#[derive(Debug, Default)]
struct StreamBuffer {
    text: String,
    reasoning: String,
    active: bool,
}

impl StreamBuffer {
    fn start(&mut self) {
        self.text.clear();
        self.reasoning.clear();
        self.active = true;
    }

    fn take(&mut self) -> String {
        self.reasoning.clear();
        self.active = false;
        std::mem::take(&mut self.text)
    }

    fn discard(&mut self) {
        self.text.clear();
        self.reasoning.clear();
        self.active = false;
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the conversation, system message included.
    pub message_count: usize,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// The sampling temperature.
    pub temperature: f32,
    /// The system prompt seeded on clear.
    pub system_prompt: String,
    /// Total number of requests issued.
    pub total_requests: u64,
    /// Requests whose response was committed.
    pub committed_responses: u64,
    /// Requests that ended in a failure.
    pub failed_responses: u64,
    /// Requests cancelled before they finished.
    pub cancelled_responses: u64,
    /// Usage reported by the most recent session, if any.
    pub last_usage: Option<Usage>,
}

/// Drives streaming completions for one conversation.
///
/// Only one session can be in flight: every mutating method takes `&mut self`, so a second
/// send or a clear cannot start while [`send_streaming_message`](Self::send_streaming_message)
/// is pending.  Observers use [`subscribe`](Self::subscribe) and cancellers use
/// [`cancel_handle`](Self::cancel_handle).
pub struct StreamingSessionController<T: CompletionTransport> {
    transport: T,
    config: ChatConfig,
    store: ConversationStore,
    usage: UsageAggregator,
    buffer: StreamBuffer,
    state: SessionState,
    last_error: Option<String>,
    snapshots: watch::Sender<SessionSnapshot>,
    cancel: CancelHandle,
    total_requests: u64,
    committed_responses: u64,
    failed_responses: u64,
    cancelled_responses: u64,
}

impl<T: CompletionTransport> StreamingSessionController<T> {
    /// Creates a controller whose conversation is seeded with the configured system prompt.
    pub fn new(transport: T, config: ChatConfig) -> Self {
        let store = ConversationStore::new(config.system_prompt.clone());
        let initial = SessionSnapshot {
            state: SessionState::Idle,
            active: false,
            buffer: String::new(),
            reasoning: String::new(),
            usage: None,
            messages: Arc::from(store.all()),
            last_error: None,
        };
        let (snapshots, _) = watch::channel(initial);
        Self {
            transport,
            config,
            store,
            usage: UsageAggregator::new(),
            buffer: StreamBuffer::default(),
            state: SessionState::Idle,
            last_error: None,
            snapshots,
            cancel: CancelHandle::default(),
            total_requests: 0,
            committed_responses: 0,
            failed_responses: 0,
            cancelled_responses: 0,
        }
    }

    /// Returns a receiver that sees every published [`SessionSnapshot`].
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Returns the most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Returns a handle that cancels the in-flight session.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while a streaming buffer exists.
    pub fn is_active(&self) -> bool {
        self.buffer.active
    }

    /// Returns the text streamed so far, if a session is in flight.
    pub fn streaming_text(&self) -> Option<&str> {
        self.buffer.active.then_some(self.buffer.text.as_str())
    }

    /// Returns the latest usage snapshot of the current or most recent session.
    pub fn usage(&self) -> Option<Usage> {
        self.usage.current()
    }

    /// Returns the conversation.
    pub fn conversation(&self) -> &ConversationStore {
        &self.store
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Appends a message to the conversation without sending anything.
    pub fn append_message(&mut self, message: Message) {
        self.store.append(message);
        self.publish();
    }

    /// Appends a user message, then streams the assistant's reply.
    pub async fn send_user_message(&mut self, content: impl Into<String>) -> StreamOutcome {
        self.append_message(Message::user(content));
        self.send_streaming_message().await
    }

    /// Streams a reply to the conversation as it stands.
    ///
    /// The caller appends the triggering user message first.  Chunks are folded into the
    /// buffer as they arrive.  When the stream ends a non-empty buffer is committed as an
    /// assistant message.  When it fails the partial text is discarded and a synthetic
    /// assistant message describing the error is committed instead.  Nothing is committed when
    /// the session is cancelled through a [`CancelHandle`].
    pub async fn send_streaming_message(&mut self) -> StreamOutcome {
        SESSION_STARTED.click();
        let started = Instant::now();
        let token = self.cancel.arm();
        self.start();

        let request = ChatCompletionRequest::streaming(
            self.store.all().to_vec(),
            self.config.model.clone(),
            self.config.max_tokens,
            self.config.temperature,
        );
        self.total_requests += 1;

        let outcome = self.drive(request, &token).await;
        self.cancel.disarm();
        SESSION_DURATION.add(started.elapsed().as_secs_f64());
        outcome
    }

    /// Abandons the current session: the buffer is discarded, usage is cleared and the
    /// controller returns to `Idle` without appending anything.
    ///
    /// A pending [`send_streaming_message`](Self::send_streaming_message) is cancelled through
    /// a [`CancelHandle`]; this method also recovers a controller whose send future was dropped.
    pub fn cancel_streaming_response(&mut self) {
        self.cancel.cancel();
        self.cancel.disarm();
        self.buffer.discard();
        self.usage.reset();
        self.state = SessionState::Idle;
        self.publish();
    }

    /// Empties the conversation and re-seeds the system message.
    pub fn clear_conversation(&mut self) {
        self.store.clear();
        self.usage.reset();
        self.buffer.discard();
        self.state = SessionState::Idle;
        self.last_error = None;
        self.publish();
    }

    /// Changes the model used for subsequent requests.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.config.max_tokens = max_tokens;
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.config.temperature = temperature;
    }

    /// Changes the system prompt seeded by the next
    /// [`clear_conversation`](Self::clear_conversation).
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.store.set_system_prompt(prompt.clone());
        self.config.system_prompt = prompt;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.store.len(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system_prompt: self.config.system_prompt.clone(),
            total_requests: self.total_requests,
            committed_responses: self.committed_responses,
            failed_responses: self.failed_responses,
            cancelled_responses: self.cancelled_responses,
            last_usage: self.usage.current(),
        }
    }

    async fn drive(
        &mut self,
        request: ChatCompletionRequest,
        token: &CancellationToken,
    ) -> StreamOutcome {
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.transport.stream_chat_completion(request) => Some(result),
        };
        let mut stream: ChunkStream = match opened {
            None => return self.cancelled(),
            Some(Err(err)) => return self.failed(err),
            Some(Ok(stream)) => stream,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                item = stream.next() => Some(item),
            };
            match next {
                None => {
                    // Dropping the stream aborts the transport's read.
                    drop(stream);
                    return self.cancelled();
                }
                Some(Some(Ok(chunk))) => self.apply(&chunk),
                Some(Some(Err(err))) => return self.failed(err),
                Some(None) => return self.finished(),
            }
        }
    }

    fn start(&mut self) {
        self.buffer.start();
        self.usage.reset();
        self.state = SessionState::Streaming;
        self.last_error = None;
        self.publish();
    }

    /// Folds one chunk into the buffer and usage, publishing both together.
    fn apply(&mut self, chunk: &ChatCompletionChunk) {
        let text = chunk.delta_text();
        let reasoning = chunk.delta_reasoning();
        let usage = chunk.usage;
        if text.is_none() && reasoning.is_none() && usage.is_none() {
            return;
        }

        if let Some(text) = text {
            self.buffer.text.push_str(text);
        }
        if let Some(reasoning) = reasoning {
            self.buffer.reasoning.push_str(reasoning);
        }
        if let Some(usage) = usage {
            self.usage.update(usage);
        }

        self.snapshots.send_modify(|snapshot| {
            if let Some(text) = text {
                snapshot.buffer.push_str(text);
            }
            if let Some(reasoning) = reasoning {
                snapshot.reasoning.push_str(reasoning);
            }
            if usage.is_some() {
                snapshot.usage = usage;
            }
        });
    }

    fn finished(&mut self) -> StreamOutcome {
        self.transition(SessionState::Finalizing);
        let text = self.buffer.take();
        let outcome = if text.is_empty() {
            SESSION_EMPTY.click();
            StreamOutcome::Empty
        } else {
            SESSION_COMMITTED.click();
            self.committed_responses += 1;
            self.store.append(Message::assistant(text));
            StreamOutcome::Committed
        };
        self.state = SessionState::Idle;
        self.publish();
        outcome
    }

    fn failed(&mut self, err: Error) -> StreamOutcome {
        SESSION_FAILED.click();
        self.failed_responses += 1;
        self.buffer.discard();
        self.last_error = Some(err.to_string());
        self.state = SessionState::Failed;
        self.publish();

        self.store
            .append(Message::assistant(format!("{ERROR_MESSAGE_PREFIX}{err}")));
        self.state = SessionState::Idle;
        self.publish();
        StreamOutcome::Failed(err)
    }

    fn cancelled(&mut self) -> StreamOutcome {
        SESSION_CANCELLED.click();
        self.cancelled_responses += 1;
        self.buffer.discard();
        self.usage.reset();
        self.state = SessionState::Idle;
        self.publish();
        StreamOutcome::Cancelled
    }

    fn transition(&mut self, state: SessionState) {
        self.state = state;
        self.snapshots.send_modify(|s| s.state = state);
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot {
            state: self.state,
            active: self.buffer.active,
            buffer: self.buffer.text.clone(),
            reasoning: self.buffer.reasoning.clone(),
            usage: self.usage.current(),
            messages: Arc::from(self.store.all()),
            last_error: self.last_error.clone(),
        });
    }
}

impl<T: CompletionTransport + fmt::Debug> fmt::Debug for StreamingSessionController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSessionController")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("messages", &self.store.len())
            .field("usage", &self.usage.current())
            .finish_non_exhaustive()
    }
}
