//! End-to-end evaluation against scripted models

use std::sync::Arc;
use std::time::Duration;

use startup_evaluator::MethodUsed;
use startup_evaluator::cache::ResultCache;
use startup_evaluator::clients::{Enhancer, ScriptedEnhancer, ScriptedGenerator};
use startup_evaluator::error::EvaluatorError;
use startup_evaluator::pipeline::{EvaluationPipeline, EvaluationSettings};
use startup_evaluator::profile::{StartupProfile, ValidationError};

const RAW: &str = "Acme has a clear problem statement and early pilots with two regional banks.";

fn acme() -> StartupProfile {
    StartupProfile {
        name: "Acme".into(),
        industry: "FinTech".into(),
        pitch: "A".repeat(25),
        founded_year: "2021".into(),
        funding: "Seed".into(),
    }
}

fn five() -> (Vec<String>, Vec<String>) {
    (
        (1..=5).map(|i| format!("Question {i}?")).collect(),
        (1..=5).map(|i| format!("Answer {i}")).collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_enhancer_always_fails() {
    let generator = Arc::new(ScriptedGenerator::always(RAW));
    let enhancer = Arc::new(ScriptedEnhancer::failing("upstream 502"));
    let cache = Arc::new(ResultCache::new());
    let pipeline = EvaluationPipeline::new(
        generator,
        Some(enhancer.clone() as Arc<dyn Enhancer>),
        EvaluationSettings::default(),
    )
    .with_sink(cache.clone());
    let (questions, answers) = five();

    let start = tokio::time::Instant::now();
    let out = pipeline.run(&acme(), &questions, &answers, true).await.unwrap();

    assert_eq!(out.method_used, MethodUsed::PrimaryWithEnhancementError);
    assert!(out.evaluation.contains(RAW));
    assert!(out.evaluation.contains("upstream 502"));
    assert_eq!(enhancer.calls(), 3);
    // 2s + 3s of backoff between the three attempts
    assert!(start.elapsed() >= Duration::from_secs(5));

    let listed = cache.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].method_used, MethodUsed::PrimaryWithEnhancementError);
}

#[tokio::test]
async fn test_bad_answer_sets_never_reach_generator() {
    let generator = Arc::new(ScriptedGenerator::always(RAW));
    let pipeline = EvaluationPipeline::new(generator.clone(), None, EvaluationSettings::default());
    let (questions, answers) = five();

    let err = pipeline
        .run(&acme(), &questions[..4], &answers[..4], false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EvaluatorError::Validation(ValidationError::InsufficientQuestions { count: 4, min: 5 })
    ));

    let err = pipeline
        .run(&acme(), &questions, &answers[..3], false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EvaluatorError::Validation(ValidationError::AnswerCountMismatch {
            questions: 5,
            answers: 3
        })
    ));

    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_same_questions_share_cache_key() {
    let cache = Arc::new(ResultCache::new());
    let pipeline = EvaluationPipeline::new(
        Arc::new(ScriptedGenerator::always(RAW)),
        None,
        EvaluationSettings::default(),
    )
    .with_sink(cache.clone());
    let (questions, answers) = five();

    let first = pipeline.run(&acme(), &questions, &answers, false).await.unwrap();
    let second = pipeline.run(&acme(), &questions, &answers, false).await.unwrap();
    assert_eq!(first.cache_key, second.cache_key);
    assert_eq!(cache.len(), 1);
}
