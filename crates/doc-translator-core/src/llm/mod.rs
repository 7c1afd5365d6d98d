mod openai;
mod traits;

pub use openai::OpenAiChat;
pub use traits::{ChatModel, ChatModelInfo, ChatRequest};

use crate::config::LlmConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a chat model from configuration
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(OpenAiChat::new(config)?))
}
