use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(label)
    }
}

/// A single conversation entry: who said it and what they said.
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn get_text(&self) -> &str {
        &self.content
    }
}

/// One streamed fragment of a reply.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatChunk {
    pub role: Role,
    pub content: String,
}

impl ChatChunk {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn get_text(&self) -> &str {
        &self.content
    }
}

impl From<ChatChunk> for ChatMessage {
    fn from(chunk: ChatChunk) -> Self {
        ChatMessage {
            role: chunk.role,
            content: chunk.content,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a new chat request from an iterator of message references.
    ///
    /// Messages are cloned only once when constructing the request.
    pub fn new<'a>(messages: impl IntoIterator<Item = &'a ChatMessage>) -> Self {
        ChatRequest {
            messages: messages.into_iter().cloned().collect(),
            temperature: None,
        }
    }

    /// Set the sampling temperature sent to the provider
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}
