// Public modules
pub mod chunk;
pub mod message;
pub mod model;
pub mod request;
pub mod usage;

// Re-exports
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, FinishReason};
pub use message::{Message, MessageRole};
pub use model::{KnownModel, Model};
pub use request::{ChatCompletionRequest, StreamOptions};
pub use usage::{CompletionTokensDetails, Usage};
