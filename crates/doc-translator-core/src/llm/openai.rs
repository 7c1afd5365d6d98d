use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::traits::{ChatModel, ChatModelInfo, ChatRequest};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// OpenAI-compatible chat-completion client.
/// Works with: OpenAI, Azure-style proxies, Ollama, llama.cpp server, etc.
pub struct OpenAiChat {
    client: Client,
    /// Base URL for the API (e.g., "https://api.openai.com/v1")
    api_base: String,
    /// Optional API key for bearer authentication
    api_key: Option<String>,
    /// Number of attempts per completion
    retry_count: u32,
    /// Delay between attempts in milliseconds
    retry_delay_ms: u64,
    /// Fallback wait on HTTP 429 without a Retry-After header
    rate_limit_delay_secs: u64,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::LlmRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
            rate_limit_delay_secs: config.rate_limit_delay_secs,
        })
    }

    fn body<'a>(request: &'a ChatRequest) -> CompletionBody<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.user,
        });

        CompletionBody {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = Self::body(request);

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Completion request attempt {}/{} to {} ({})",
                attempt + 1,
                self.retry_count,
                url,
                request.model
            );

            let mut req = self.client.post(&url).json(&body);

            if let Some(ref key) = self.api_key {
                req = req.bearer_auth(key);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<CompletionResponse>().await {
                            Ok(parsed) => {
                                if let Some(content) = parsed
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.message.content)
                                {
                                    return Ok(content.trim().to_string());
                                }
                                last_error = Some(Error::LlmInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
                            }
                            Err(e) => {
                                warn!("Failed to parse completion: {}", e);
                                last_error = Some(Error::LlmInvalidResponse(e.to_string()));
                            }
                        }
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<u64>().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::LlmRateLimited { retry_after });

                        if attempt + 1 < self.retry_count {
                            let wait_secs = retry_after.unwrap_or(self.rate_limit_delay_secs);
                            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        }
                        continue;
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        warn!("Completion API error: {} - {}", status, body);
                        last_error = Some(Error::LlmRequest(format!("HTTP {status}: {body}")));
                    }
                }
                Err(e) => {
                    warn!("Completion request failed: {}", e);
                    last_error = Some(if e.is_timeout() {
                        Error::LlmTimeout
                    } else {
                        Error::LlmRequest(e.to_string())
                    });
                }
            }

            if attempt + 1 < self.retry_count {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Completion failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::LlmMaxRetriesExceeded))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn info(&self) -> ChatModelInfo {
        ChatModelInfo {
            name: "OpenAI Compatible",
            requires_api_key: false,
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        if request.user.trim().is_empty() {
            return Ok(String::new());
        }
        self.request_with_retry(request).await
    }
}
