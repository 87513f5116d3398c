use crate::client::Client;
use crate::{ChatModel, ModelProvider};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::sync::Arc;

use super::chat::OpenAIChatModel;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
}

const API_VERSION: &str = "v1";

impl OpenAIProvider {
    pub fn default(api_key: &str) -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a provider with a custom base URL (e.g., for proxying or
    /// OpenAI-compatible servers). The API version path (/v1) is appended.
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        Self::with_base_url(base_url, api_key)
    }

    fn with_base_url(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| anyhow::anyhow!("Invalid API key format"))?,
        );

        let base_url = base_url.trim_end_matches('/');
        Ok(OpenAIProvider {
            client: Client::with_headers(headers)?,
            base_url: format!("{}/{}", base_url, API_VERSION),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ModelProvider for OpenAIProvider {
    fn create_chat_model(&self, model_name: &str) -> Option<Arc<dyn ChatModel + Send + Sync>> {
        Some(Arc::new(OpenAIChatModel::new(
            self.client.clone(),
            self.base_url.clone(),
            model_name.to_string(),
        )))
    }
}
