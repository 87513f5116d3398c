use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

pub mod api;
mod client;
pub mod error;
pub mod providers;
pub use api::*;
pub use error::LlmError;
pub use providers::{OpenAIChatModel, OpenAIProvider};

/// Stream of reply fragments. The stream ending is the completion signal;
/// an `Err` item means the transport failed mid-reply.
pub type ChatStream = Pin<Box<dyn Stream<Item = anyhow::Result<ChatChunk>> + Send>>;

#[async_trait]
pub trait ChatModel {
    fn name(&self) -> &str;

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage>;

    async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatStream>;
}

// Blanket implementation for Arc<dyn ChatModel> to make it easier to work with
#[async_trait]
impl ChatModel for Arc<dyn ChatModel + Send + Sync> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        (**self).chat(request).await
    }

    async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatStream> {
        (**self).stream_chat(request).await
    }
}

pub trait ModelProvider {
    /// Create a chat model by name, returned as Arc for sharing across threads
    fn create_chat_model(&self, model_name: &str) -> Option<Arc<dyn ChatModel + Send + Sync>>;
}
