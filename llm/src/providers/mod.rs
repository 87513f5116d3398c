pub(crate) mod openai;

pub use openai::{OpenAIChatModel, OpenAIProvider};
