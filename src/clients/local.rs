use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::clients::traits::{GenerationParams, Generator, GeneratorError, ModelStatus};

/// Fine-tuned adapter served by a local OpenAI-compatible inference server
/// (llama.cpp, vLLM, text-generation-inference).
///
/// One permit per generator: the server holds a single copy of the model,
/// so concurrent requests queue here instead of contending on the GPU.
#[derive(Debug)]
pub struct LocalGenerator {
    endpoint: String,
    model: String,
    client: Client,
    timeout_ms: u64,
    permit: Semaphore,
    loaded: AtomicBool,
}

impl LocalGenerator {
    pub fn new(endpoint: &str, model: impl Into<String>, timeout_ms: u64) -> Result<Self, GeneratorError> {
        let endpoint = if endpoint.ends_with("/v1/completions") {
            endpoint.to_string()
        } else {
            format!("{}/v1/completions", endpoint.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GeneratorError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            model: model.into(),
            client,
            timeout_ms,
            permit: Semaphore::new(1),
            loaded: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> GeneratorError {
        if e.is_timeout() {
            GeneratorError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            GeneratorError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Generator for LocalGenerator {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, GeneratorError> {
        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|e| GeneratorError::Transport(format!("generator queue closed: {e}")))?;

        debug!(
            "Local generation (model={}, prompt_chars={}, max_tokens={})",
            self.model,
            prompt.len(),
            params.max_tokens
        );

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": 0.95,
            "top_k": 50,
            "repetition_penalty": 1.1,
            "stream": false
        });

        let res = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GeneratorError::Status { status, body });
        }

        let response_json: Value = res
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(e.to_string()))?;

        let text = response_json["choices"][0]["text"]
            .as_str()
            .ok_or_else(|| GeneratorError::Parse("missing choices[0].text".to_string()))?
            .trim()
            .to_string();

        if !self.loaded.swap(true, Ordering::SeqCst) {
            info!("Model {} answered its first request", self.model);
        }
        Ok(text)
    }

    fn status(&self) -> ModelStatus {
        ModelStatus {
            name: self.model.clone(),
            loaded: self.loaded.load(Ordering::SeqCst),
        }
    }

    async fn release(&self) {
        if self.loaded.swap(false, Ordering::SeqCst) {
            info!("Released model {}", self.model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalisation() {
        let g = LocalGenerator::new("http://127.0.0.1:8111/", "adapter", 1000).unwrap();
        assert_eq!(g.endpoint(), "http://127.0.0.1:8111/v1/completions");

        let g = LocalGenerator::new("http://host:9/v1/completions", "adapter", 1000).unwrap();
        assert_eq!(g.endpoint(), "http://host:9/v1/completions");
    }

    #[tokio::test]
    async fn test_status_tracks_release() {
        let g = LocalGenerator::new("http://127.0.0.1:1", "question-adapter", 1000).unwrap();
        assert_eq!(
            g.status(),
            ModelStatus {
                name: "question-adapter".into(),
                loaded: false
            }
        );
        g.loaded.store(true, Ordering::SeqCst);
        assert!(g.status().loaded);
        g.release().await;
        assert!(!g.status().loaded);
    }
}
