//! The evaluator service: owns the model capabilities and the result cache,
//! and exposes the request/response contracts both front ends (HTTP and the
//! offline CLI) call into.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::{CachedSummary, ResultCache};
use crate::clients::{
    Enhancer, EnhancerStatus, Generator, GroqEnhancer, LocalGenerator, ModelStatus,
};
use crate::config::Config;
use crate::deserializers::{de_bool_default_true, default_true};
use crate::error::{EvaluatorError, Result};
use crate::parser::CriterionScore;
use crate::pipeline::{
    EvaluationPipeline, EvaluationSettings, MethodUsed, QuestionPipeline, QuestionSettings,
};
use crate::profile::StartupProfile;

/// Kept between the enhancer's last moment and the pipeline deadline so the
/// primary result can still be finalized.
pub const ENHANCEMENT_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENDPOINTS: [&str; 8] = [
    "POST /generate-questions",
    "POST /evaluate-startup",
    "GET /cached-evaluations",
    "DELETE /cached-evaluations",
    "GET /health",
    "POST /test-enhancer",
    "POST /cleanup",
    "GET /system-info",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(flatten)]
    pub profile: StartupProfile,
    #[serde(default = "default_true", deserialize_with = "de_bool_default_true")]
    pub enhance_with_secondary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub questions: Vec<String>,
    pub raw_questions: Option<Vec<String>>,
    pub count: usize,
    pub method_used: MethodUsed,
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub startup: StartupProfile,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default = "default_true", deserialize_with = "de_bool_default_true")]
    pub enhance_with_secondary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub evaluation: String,
    pub raw_evaluation: Option<String>,
    pub questions_used: Vec<String>,
    pub method_used: MethodUsed,
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub criteria: Vec<CriterionScore>,
    #[serde(default)]
    pub overall_score: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedListing {
    pub cached_evaluations: Vec<CachedSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedCache {
    pub message: String,
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsReport {
    pub base_model: String,
    pub question: ModelStatus,
    pub evaluation: ModelStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub models: ModelsReport,
    pub enhancer: EnhancerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancerTestReport {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub message: String,
    pub cleared_evaluations: usize,
    pub models_released: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub timestamp: DateTime<Utc>,
    pub models: ModelsReport,
    pub enhancer: EnhancerStatus,
    pub cached_evaluations: usize,
    pub endpoints: Vec<String>,
}

pub struct EvaluatorService {
    question_generator: Arc<dyn Generator>,
    evaluation_generator: Arc<dyn Generator>,
    enhancer: Option<Arc<dyn Enhancer>>,
    cache: Arc<ResultCache>,
    base_model: String,
    question_settings: QuestionSettings,
    evaluation_settings: EvaluationSettings,
    question_timeout: Duration,
    evaluation_timeout: Duration,
    probe_timeout: Duration,
}

impl EvaluatorService {
    pub fn new(
        question_generator: Arc<dyn Generator>,
        evaluation_generator: Arc<dyn Generator>,
        enhancer: Option<Arc<dyn Enhancer>>,
    ) -> Self {
        Self {
            question_generator,
            evaluation_generator,
            enhancer,
            cache: Arc::new(ResultCache::new()),
            base_model: String::new(),
            question_settings: QuestionSettings::default(),
            evaluation_settings: EvaluationSettings::default(),
            question_timeout: Duration::from_millis(120_000),
            evaluation_timeout: Duration::from_millis(600_000),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Builds the real capabilities: two adapters on the local inference
    /// server, plus the hosted enhancer when an API key is present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let models = &config.models;
        let question = LocalGenerator::new(
            &models.endpoint,
            models.question_adapter.clone(),
            models.request_timeout_ms,
        )
        .map_err(|e| EvaluatorError::Config {
            message: e.to_string(),
        })?;
        let evaluation = LocalGenerator::new(
            &models.endpoint,
            models.eval_adapter.clone(),
            models.request_timeout_ms,
        )
        .map_err(|e| EvaluatorError::Config {
            message: e.to_string(),
        })?;
        info!("Primary generators at {}", question.endpoint());

        let enhancer: Option<Arc<dyn Enhancer>> = match &config.runtime.groq_api_key {
            Some(key) => match GroqEnhancer::new(
                key.clone(),
                &config.enhancer.base_url,
                config.enhancer.model.clone(),
                config.enhancer.request_timeout_ms,
            ) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Enhancer disabled: {}", e);
                    None
                }
            },
            None => {
                warn!("GROQ_API_KEY not set; secondary enhancement disabled");
                None
            }
        };

        Ok(
            Self::new(Arc::new(question), Arc::new(evaluation), enhancer)
                .with_base_model(models.base_model.clone())
                .with_settings(config.question_settings(), config.evaluation_settings())
                .with_timeouts(
                    Duration::from_millis(config.runtime.question_timeout_ms),
                    Duration::from_millis(config.runtime.evaluation_timeout_ms),
                )
                .with_probe_timeout(Duration::from_millis(config.runtime.probe_timeout_ms)),
        )
    }

    pub fn with_base_model(mut self, base_model: impl Into<String>) -> Self {
        self.base_model = base_model.into();
        self
    }

    pub fn with_settings(mut self, questions: QuestionSettings, evaluations: EvaluationSettings) -> Self {
        self.question_settings = questions;
        self.evaluation_settings = evaluations;
        self
    }

    pub fn with_timeouts(mut self, questions: Duration, evaluations: Duration) -> Self {
        self.question_timeout = questions;
        self.evaluation_timeout = evaluations;
        self
    }

    /// Upper bound on the live enhancer check behind health, system info and
    /// the enhancer test.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub async fn generate_questions(&self, request: &QuestionRequest) -> Result<QuestionResponse> {
        let mut settings = self.question_settings;
        settings.retry = settings
            .retry
            .with_deadline(enhancement_deadline(self.question_timeout));
        let pipeline = QuestionPipeline::new(
            self.question_generator.clone(),
            self.enhancer.clone(),
            settings,
        );
        let outcome = with_deadline(
            "generate_questions",
            self.question_timeout,
            pipeline.run(&request.profile, request.enhance_with_secondary),
        )
        .await?;

        Ok(QuestionResponse {
            count: outcome.questions.len(),
            questions: outcome.questions,
            raw_questions: outcome.raw_questions,
            method_used: outcome.method_used,
            processing_time: outcome.processing_time,
        })
    }

    pub async fn evaluate_startup(&self, request: &EvaluationRequest) -> Result<EvaluationResponse> {
        let mut settings = self.evaluation_settings;
        settings.retry = settings
            .retry
            .with_deadline(enhancement_deadline(self.evaluation_timeout));
        let pipeline = EvaluationPipeline::new(
            self.evaluation_generator.clone(),
            self.enhancer.clone(),
            settings,
        )
        .with_sink(self.cache.clone());
        let outcome = with_deadline(
            "evaluate_startup",
            self.evaluation_timeout,
            pipeline.run(
                &request.startup,
                &request.questions,
                &request.answers,
                request.enhance_with_secondary,
            ),
        )
        .await?;

        Ok(EvaluationResponse {
            evaluation: outcome.evaluation,
            raw_evaluation: outcome.raw_evaluation,
            questions_used: request.questions.clone(),
            method_used: outcome.method_used,
            processing_time: outcome.processing_time,
            timestamp: outcome.timestamp,
            criteria: outcome.criteria,
            overall_score: outcome.overall_score,
        })
    }

    pub fn list_cached(&self) -> CachedListing {
        let cached_evaluations = self.cache.list();
        CachedListing {
            count: cached_evaluations.len(),
            cached_evaluations,
        }
    }

    pub fn clear_cached(&self) -> ClearedCache {
        let cleared = self.cache.clear();
        info!("Cleared {} cached evaluations", cleared);
        ClearedCache {
            message: format!("Cleared {cleared} cached evaluations"),
            cleared,
        }
    }

    fn models_report(&self) -> ModelsReport {
        ModelsReport {
            base_model: self.base_model.clone(),
            question: self.question_generator.status(),
            evaluation: self.evaluation_generator.status(),
        }
    }

    async fn probe_enhancer(&self, enhancer: &dyn Enhancer) -> bool {
        match tokio::time::timeout(self.probe_timeout, enhancer.test_connection()).await {
            Ok(reachable) => reachable,
            Err(_) => {
                warn!(
                    "Enhancer {} did not answer the connection test within {}ms",
                    enhancer.model(),
                    self.probe_timeout.as_millis()
                );
                false
            }
        }
    }

    /// Configured-ness comes from construction; reachability is probed live.
    pub async fn enhancer_status(&self) -> EnhancerStatus {
        match &self.enhancer {
            Some(enhancer) => EnhancerStatus {
                configured: true,
                reachable: self.probe_enhancer(enhancer.as_ref()).await,
                model: Some(enhancer.model().to_string()),
            },
            None => EnhancerStatus {
                configured: false,
                reachable: false,
                model: None,
            },
        }
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            models: self.models_report(),
            enhancer: self.enhancer_status().await,
        }
    }

    pub async fn test_enhancer(&self) -> EnhancerTestReport {
        let Some(enhancer) = &self.enhancer else {
            return EnhancerTestReport {
                status: "error".to_string(),
                message: "Enhancer is not configured; set GROQ_API_KEY".to_string(),
            };
        };
        if self.probe_enhancer(enhancer.as_ref()).await {
            EnhancerTestReport {
                status: "success".to_string(),
                message: format!("Enhancer {} is working correctly", enhancer.model()),
            }
        } else {
            EnhancerTestReport {
                status: "failed".to_string(),
                message: format!("Enhancer {} connection test failed", enhancer.model()),
            }
        }
    }

    /// Releases both primary models and empties the result cache.
    pub async fn cleanup(&self) -> CleanupReport {
        let cleared_evaluations = self.cache.clear();
        self.question_generator.release().await;
        self.evaluation_generator.release().await;
        info!(
            "Cleanup released models and cleared {} evaluations",
            cleared_evaluations
        );
        CleanupReport {
            message: "System cleanup completed".to_string(),
            cleared_evaluations,
            models_released: true,
        }
    }

    pub async fn system_info(&self) -> SystemInfo {
        SystemInfo {
            timestamp: Utc::now(),
            models: self.models_report(),
            enhancer: self.enhancer_status().await,
            cached_evaluations: self.cache.len(),
            endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Latest instant the enhancer may still be running for a pipeline that
/// starts now under `timeout`.
fn enhancement_deadline(timeout: Duration) -> Instant {
    Instant::now() + timeout.saturating_sub(ENHANCEMENT_DEADLINE_MARGIN)
}

async fn with_deadline<T>(
    operation: &str,
    deadline: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {}ms", operation, deadline.as_millis());
            Err(EvaluatorError::Timeout {
                operation: operation.to_string(),
                timeout_ms: deadline.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ScriptedEnhancer, ScriptedGenerator};

    const NUMBERED: &str = "1. What is your revenue model today?\n\
                            2. How many paying customers do you have?\n\
                            3. Who are your closest competitors?";

    fn service(enhancer: Option<Arc<ScriptedEnhancer>>) -> EvaluatorService {
        EvaluatorService::new(
            Arc::new(ScriptedGenerator::always(NUMBERED)),
            Arc::new(ScriptedGenerator::always(
                "A thorough primary evaluation of the founder answers with enough detail.",
            )),
            enhancer.map(|e| e as Arc<dyn Enhancer>),
        )
        .with_base_model("base")
    }

    #[test]
    fn test_question_request_accepts_flat_profile() {
        let req: QuestionRequest = serde_json::from_str(
            r#"{"name":"Acme","industry":"FinTech","pitch":"p","founded_year":2021,"funding":"Seed"}"#,
        )
        .unwrap();
        assert_eq!(req.profile.founded_year, "2021");
        assert!(req.enhance_with_secondary);
    }

    #[tokio::test]
    async fn test_question_response_counts() {
        let svc = service(None);
        let req = QuestionRequest {
            profile: StartupProfile {
                name: "Acme".into(),
                industry: "FinTech".into(),
                pitch: "We reconcile invoices automatically.".into(),
                founded_year: "2021".into(),
                funding: "Seed".into(),
            },
            enhance_with_secondary: false,
        };
        let resp = svc.generate_questions(&req).await.unwrap();
        assert_eq!(resp.count, 10);
        assert_eq!(resp.questions.len(), 10);
        assert_eq!(resp.method_used, MethodUsed::PrimaryOnly);
    }

    #[tokio::test]
    async fn test_health_and_cleanup() {
        let svc = service(Some(Arc::new(ScriptedEnhancer::always("ok").unreachable())));
        let health = svc.health().await;
        assert_eq!(health.status, "healthy");
        assert!(health.enhancer.configured);
        assert!(!health.enhancer.reachable);
        assert_eq!(health.models.base_model, "base");

        let report = svc.test_enhancer().await;
        assert_eq!(report.status, "failed");

        let cleanup = svc.cleanup().await;
        assert_eq!(cleanup.cleared_evaluations, 0);
        assert!(cleanup.models_released);
        assert!(!svc.models_report().question.loaded);
    }

    #[tokio::test]
    async fn test_unconfigured_enhancer_reports_error() {
        let svc = service(None);
        assert_eq!(svc.test_enhancer().await.status, "error");
        let info = svc.system_info().await;
        assert!(!info.enhancer.configured);
        assert_eq!(info.cached_evaluations, 0);
        assert!(info.endpoints.iter().any(|e| e == "POST /evaluate-startup"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_maps_to_timeout() {
        let err = with_deadline("slow_op", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, EvaluatorError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            EvaluatorError::Timeout { timeout_ms: 50, .. }
        ));
    }
}
