use crate::ChatModel;
use crate::ChatStream;
use crate::api::{ChatChunk, ChatMessage, ChatRequest, Role};
use crate::client::Client;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::api::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, sse_payload};

#[derive(Clone)]
pub struct OpenAIChatModel {
    client: Client,
    base_url: String,
    model_name: String,
}

impl OpenAIChatModel {
    pub fn new(client: Client, base_url: String, model_name: String) -> Self {
        OpenAIChatModel {
            client,
            base_url,
            model_name,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        let openai_request =
            ChatCompletionRequest::from_request(self.model_name.clone(), request, false);
        let response: ChatCompletionResponse =
            self.client.post(self.chat_url(), &openai_request).await?;
        Ok(response.into())
    }

    async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatStream> {
        let openai_request =
            ChatCompletionRequest::from_request(self.model_name.clone(), request, true);
        debug!(
            model = %self.model_name,
            messages = openai_request.messages.len(),
            "Starting streamed completion"
        );

        let stream = self
            .client
            .post_stream::<_, _, _, ChatCompletionChunk>(self.chat_url(), &openai_request, sse_payload)
            .await?;

        // Chunks without choices (usage reports) carry no text
        let chat_stream = stream.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => {
                    let choice = chunk.choices.into_iter().next()?;
                    let role = choice.delta.role.unwrap_or(Role::Assistant);
                    let content = choice.delta.content.unwrap_or_default();
                    Some(Ok(ChatChunk::new(role, content)))
                }
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(chat_stream))
    }
}
