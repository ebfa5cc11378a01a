use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling knobs passed through to a model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Transport(String),
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generator response could not be parsed: {0}")]
    Parse(String),
    #[error("generator timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[derive(Debug, Error)]
pub enum EnhancerError {
    #[error("enhancer is not configured: {0}")]
    NotConfigured(String),
    #[error("enhancer request failed: {0}")]
    Transport(String),
    #[error("enhancer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("enhancer response could not be parsed: {0}")]
    Parse(String),
    #[error("enhancer timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Load state of one primary model, as reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    pub loaded: bool,
}

/// Reachability of the enhancer, as reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancerStatus {
    pub configured: bool,
    pub reachable: bool,
    pub model: Option<String>,
}

/// A primary text model: prompt in, text out.
///
/// Implementations own any model-level queueing; callers treat `generate`
/// as an opaque call that may take tens of seconds.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, GeneratorError>;

    fn status(&self) -> ModelStatus;

    /// Drops whatever the generator holds on to. The next `generate` call
    /// brings it back.
    async fn release(&self) {}
}

/// The secondary, independently hosted model used to refine primary output.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, EnhancerError>;

    fn model(&self) -> &str;

    /// Sends a fixed probe and reports whether a sensible reply came back.
    async fn test_connection(&self) -> bool;
}
