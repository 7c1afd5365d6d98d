use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::Result;

/// Information about a chat-model backend
#[derive(Debug, Clone)]
pub struct ChatModelInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this backend refuses to work without an API key
    pub requires_api_key: bool,
}

/// One chat-completion call: an optional system message and one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Request using the sampling settings from `config` and its default model.
    pub fn new(config: &LlmConfig, user: impl Into<String>) -> Self {
        Self {
            model: config.model.clone(),
            system: None,
            user: user.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Trait for chat-completion backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Get information about this backend
    fn info(&self) -> ChatModelInfo;

    /// Get the backend name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Run one completion and return the assistant's text, trimmed
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Check if the backend is usable (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}
