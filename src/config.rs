use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::clients::GenerationParams;
use crate::enhancer::RetryPolicy;
use crate::pipeline::{EvaluationSettings, QuestionSettings};

/// Main configuration structure loaded from startup_evaluator.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub enhancer: EnhancerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Local inference server hosting the base model and both adapters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub endpoint: String,
    pub base_model: String,
    pub question_adapter: String,
    pub eval_adapter: String,
    pub request_timeout_ms: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8111".to_string(),
            base_model: "meta-llama/Meta-Llama-3-8B".to_string(),
            question_adapter: "saimqureshi656/startups-question-generation".to_string(),
            eval_adapter: "saimqureshi656/llama3-8b-startup-evaluator-lora".to_string(),
            request_timeout_ms: 300_000,
        }
    }
}

/// Hosted chat-completions API used for the second pass
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub base_url: String,
    pub model: String,
    pub max_retries: u32,
    pub request_timeout_ms: u64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            base_url: crate::clients::groq::DEFAULT_BASE_URL.to_string(),
            model: crate::clients::groq::DEFAULT_MODEL.to_string(),
            max_retries: 3,
            request_timeout_ms: 60_000,
        }
    }
}

/// Sampling parameters per call site
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub question_max_new_tokens: u32,
    pub question_temperature: f32,
    pub evaluation_max_new_tokens: u32,
    pub evaluation_temperature: f32,
    pub question_enhance_max_tokens: u32,
    pub question_enhance_temperature: f32,
    pub evaluation_enhance_max_tokens: u32,
    pub evaluation_enhance_temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            question_max_new_tokens: 1024,
            question_temperature: 0.7,
            evaluation_max_new_tokens: 4000,
            evaluation_temperature: 0.6,
            question_enhance_max_tokens: 1500,
            question_enhance_temperature: 0.4,
            evaluation_enhance_max_tokens: 3000,
            evaluation_enhance_temperature: 0.3,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub groq_api_key: Option<String>,
    pub http_bind: SocketAddr,
    pub question_timeout_ms: u64,
    pub evaluation_timeout_ms: u64,
    pub reports_path: PathBuf,
    pub reports_enabled: bool,
    pub probe_timeout_ms: u64,
}

pub const DEFAULT_LOG_FILTER: &str = "startup_evaluator=info,tower_http=info";

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            question_timeout_ms: 120_000,
            evaluation_timeout_ms: 600_000,
            reports_path: PathBuf::from("data/reports.jsonl"),
            reports_enabled: true,
            probe_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SEVAL_CONFIG environment variable or defaults to "startup_evaluator.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("SEVAL_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("SEVAL_CONFIG")
            .unwrap_or_else(|_| "startup_evaluator.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        let string_overrides: [(&str, &mut String); 6] = [
            ("SEVAL_MODEL_ENDPOINT", &mut self.models.endpoint),
            ("SEVAL_BASE_MODEL", &mut self.models.base_model),
            ("SEVAL_QUESTION_ADAPTER", &mut self.models.question_adapter),
            ("SEVAL_EVAL_ADAPTER", &mut self.models.eval_adapter),
            ("SEVAL_ENHANCER_URL", &mut self.enhancer.base_url),
            ("SEVAL_ENHANCER_MODEL", &mut self.enhancer.model),
        ];
        for (key, slot) in string_overrides {
            if let Ok(value) = std::env::var(key)
                && !value.trim().is_empty()
            {
                *slot = value.trim().to_string();
                tracing::debug!("{} env override applied", key);
            }
        }

        if let Some(retries) = std::env::var("SEVAL_ENHANCER_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.enhancer.max_retries = retries;
            tracing::debug!("SEVAL_ENHANCER_RETRIES env override applied");
        }
    }

    /// Clamp out-of-range values, warning about each adjustment.
    pub fn validate(&mut self) {
        if !(1..=10).contains(&self.enhancer.max_retries) {
            let clamped = self.enhancer.max_retries.clamp(1, 10);
            tracing::warn!(
                "enhancer.max_retries {} out of range, clamped to {}",
                self.enhancer.max_retries,
                clamped
            );
            self.enhancer.max_retries = clamped;
        }

        if !self.models.endpoint.starts_with("http://")
            && !self.models.endpoint.starts_with("https://")
        {
            tracing::warn!(
                "models.endpoint '{}' has no http(s) scheme; requests will likely fail",
                self.models.endpoint
            );
        }

        let g = &mut self.generation;
        for (name, t) in [
            ("question_temperature", &mut g.question_temperature),
            ("evaluation_temperature", &mut g.evaluation_temperature),
            ("question_enhance_temperature", &mut g.question_enhance_temperature),
            ("evaluation_enhance_temperature", &mut g.evaluation_enhance_temperature),
        ] {
            if !(0.0..=2.0).contains(&*t) {
                let clamped = if t.is_finite() { t.clamp(0.0, 2.0) } else { 0.7 };
                tracing::warn!("generation.{} {} out of range, using {}", name, t, clamped);
                *t = clamped;
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.enhancer.max_retries)
    }

    pub fn question_settings(&self) -> QuestionSettings {
        let g = &self.generation;
        QuestionSettings {
            generation: GenerationParams::new(g.question_max_new_tokens, g.question_temperature),
            enhancement: GenerationParams::new(
                g.question_enhance_max_tokens,
                g.question_enhance_temperature,
            ),
            retry: self.retry_policy(),
        }
    }

    pub fn evaluation_settings(&self) -> EvaluationSettings {
        let g = &self.generation;
        EvaluationSettings {
            generation: GenerationParams::new(g.evaluation_max_new_tokens, g.evaluation_temperature),
            enhancement: GenerationParams::new(
                g.evaluation_enhance_max_tokens,
                g.evaluation_enhance_temperature,
            ),
            retry: self.retry_policy(),
        }
    }
}

/// API key values that ship in templates and must not be sent anywhere.
fn is_placeholder_key(key: &str) -> bool {
    let k = key.trim();
    k.is_empty()
        || k.eq_ignore_ascii_case("your_groq_api_key_here")
        || k.eq_ignore_ascii_case("your-api-key")
        || k.eq_ignore_ascii_case("changeme")
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let defaults = Self::default();
        let groq_api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !is_placeholder_key(k))
            .map(|k| k.trim().to_string());

        let http_bind = match std::env::var("SEVAL_HTTP_BIND") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid SEVAL_HTTP_BIND '{}', using {}", raw, defaults.http_bind);
                defaults.http_bind
            }),
            Err(_) => defaults.http_bind,
        };

        Self {
            groq_api_key,
            http_bind,
            question_timeout_ms: std::env::var("SEVAL_QUESTION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.question_timeout_ms),
            evaluation_timeout_ms: std::env::var("SEVAL_EVALUATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.evaluation_timeout_ms),
            reports_path: std::env::var("SEVAL_REPORTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_path),
            reports_enabled: !std::env::var("SEVAL_DISABLE_REPORTS")
                .ok()
                .is_some_and(|v| v == "true" || v == "1"),
            probe_timeout_ms: std::env::var("SEVAL_PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.probe_timeout_ms),
        }
    }
}
