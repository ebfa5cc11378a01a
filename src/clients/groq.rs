use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clients::traits::{Enhancer, EnhancerError, GenerationParams};
use crate::prompts::CONNECTION_TEST_PROMPT;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";

/// Hosted chat-completions enhancer (Groq, or any OpenAI-compatible API).
#[derive(Clone, Debug)]
pub struct GroqEnhancer {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl GroqEnhancer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, EnhancerError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EnhancerError::NotConfigured(
                "GROQ_API_KEY is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| EnhancerError::Transport(format!("failed to build HTTP client: {e}")))?;

        let model = model.into();
        info!(
            "Enhancer client initialised (model={}, key={})",
            model,
            key_preview(&api_key)
        );

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            timeout_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// First eight characters of a secret, for logs.
pub fn key_preview(key: &str) -> String {
    let head: String = key.chars().take(8).collect();
    format!("{head}...")
}

#[async_trait]
impl Enhancer for GroqEnhancer {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, EnhancerError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: 0.9,
            stream: false,
        };

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnhancerError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    EnhancerError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(EnhancerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EnhancerError::Parse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn test_connection(&self) -> bool {
        match self
            .complete(CONNECTION_TEST_PROMPT, GenerationParams::new(50, 0.1))
            .await
        {
            Ok(reply) => {
                info!("Enhancer connection test reply: {}", reply.trim());
                reply.to_lowercase().contains("successful")
            }
            Err(e) => {
                warn!("Enhancer connection test failed: {}", e);
                false
            }
        }
    }
}
