//! A slow enhancer must never cost the caller a primary result

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use startup_evaluator::MethodUsed;
use startup_evaluator::clients::{Enhancer, EnhancerError, GenerationParams, ScriptedGenerator};
use startup_evaluator::profile::StartupProfile;
use startup_evaluator::service::{EvaluationRequest, EvaluatorService, QuestionRequest};

const QUESTIONS: &str = "1. What is your current monthly recurring revenue?\n\
                         2. How do you acquire your first hundred customers?\n\
                         3. Who are your closest competitors today?\n\
                         4. What does your sales cycle look like?\n\
                         5. How large is the serviceable market?\n\
                         6. What is your customer acquisition cost?\n\
                         7. How do you retain customers after onboarding?\n\
                         8. What regulatory risks does the business face?\n\
                         9. How will you use the money you raise?\n\
                         10. What milestones will you hit in the next year?";

const EVALUATION: &str = "Acme has a clear problem statement and early pilots with two regional banks.";

/// Sleeps through every call, then times out; the connection test never answers.
struct HangingEnhancer {
    stall: Duration,
    calls: AtomicUsize,
}

impl HangingEnhancer {
    fn new(stall: Duration) -> Self {
        Self {
            stall,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enhancer for HangingEnhancer {
    async fn complete(&self, _prompt: &str, _params: GenerationParams) -> Result<String, EnhancerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.stall).await;
        Err(EnhancerError::Timeout {
            timeout_ms: self.stall.as_millis() as u64,
        })
    }

    fn model(&self) -> &str {
        "hanging"
    }

    async fn test_connection(&self) -> bool {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        true
    }
}

fn acme() -> StartupProfile {
    StartupProfile {
        name: "Acme".into(),
        industry: "FinTech".into(),
        pitch: "We reconcile invoices automatically for SMBs.".into(),
        founded_year: "2021".into(),
        funding: "Seed".into(),
    }
}

fn service(enhancer: Arc<HangingEnhancer>) -> EvaluatorService {
    EvaluatorService::new(
        Arc::new(ScriptedGenerator::always(QUESTIONS)),
        Arc::new(ScriptedGenerator::always(EVALUATION)),
        Some(enhancer as Arc<dyn Enhancer>),
    )
}

#[tokio::test(start_paused = true)]
async fn test_hanging_enhancer_falls_back_within_question_deadline() {
    let enhancer = Arc::new(HangingEnhancer::new(Duration::from_secs(60)));
    let service = service(enhancer.clone());
    let request = QuestionRequest {
        profile: acme(),
        enhance_with_secondary: true,
    };

    let start = tokio::time::Instant::now();
    let response = service.generate_questions(&request).await.unwrap();

    assert_eq!(response.method_used, MethodUsed::PrimaryOnly);
    assert_eq!(response.count, 10);
    assert!(response.raw_questions.is_none());
    assert_eq!(
        response.questions[0],
        "What is your current monthly recurring revenue?"
    );
    // 60s stall, 2s backoff, then the second attempt is cut off
    assert_eq!(enhancer.calls(), 2);
    assert!(start.elapsed() < Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_enhancer_falls_back_within_evaluation_deadline() {
    let enhancer = Arc::new(HangingEnhancer::new(Duration::from_secs(60)));
    let service = service(enhancer.clone())
        .with_timeouts(Duration::from_secs(120), Duration::from_secs(90));
    let request = EvaluationRequest {
        startup: acme(),
        questions: (1..=5).map(|i| format!("Question {i}?")).collect(),
        answers: (1..=5).map(|i| format!("Answer {i}")).collect(),
        enhance_with_secondary: true,
    };

    let response = service.evaluate_startup(&request).await.unwrap();

    assert_eq!(response.method_used, MethodUsed::PrimaryWithEnhancementError);
    assert!(response.evaluation.contains(EVALUATION));
    assert!(response.raw_evaluation.is_none());
    assert_eq!(enhancer.calls(), 2);
    assert_eq!(service.list_cached().count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_connection_test_is_bounded() {
    let enhancer = Arc::new(HangingEnhancer::new(Duration::from_secs(60)));
    let service = service(enhancer).with_probe_timeout(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let health = service.health().await;
    assert!(health.enhancer.configured);
    assert!(!health.enhancer.reachable);

    let report = service.test_enhancer().await;
    assert_eq!(report.status, "failed");
    assert!(start.elapsed() < Duration::from_secs(11));
}
