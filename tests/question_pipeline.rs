//! End-to-end question generation against scripted models

use std::sync::Arc;

use startup_evaluator::MethodUsed;
use startup_evaluator::clients::{Enhancer, ScriptedEnhancer, ScriptedGenerator};
use startup_evaluator::parser::parse_questions;
use startup_evaluator::pipeline::questions::{FALLBACK_QUESTIONS, QUESTION_COUNT};
use startup_evaluator::pipeline::{QuestionPipeline, QuestionSettings};
use startup_evaluator::profile::StartupProfile;

/// Keeps short outputs above the generator failure threshold.
const HEADER: &str = "The following questions were prepared for the founding team of Acme.";

fn acme() -> StartupProfile {
    StartupProfile {
        name: "Acme".into(),
        industry: "FinTech".into(),
        pitch: "A".repeat(25),
        founded_year: "2021".into(),
        funding: "Seed".into(),
    }
}

fn numbered(n: usize) -> String {
    (1..=n)
        .map(|i| format!("{i}. How does Acme handle scenario number {i}?\n"))
        .collect()
}

fn pipeline(primary: String, enhancer: Option<ScriptedEnhancer>) -> QuestionPipeline {
    QuestionPipeline::new(
        Arc::new(ScriptedGenerator::always(primary)),
        enhancer.map(|e| Arc::new(e) as Arc<dyn Enhancer>),
        QuestionSettings::default(),
    )
}

#[tokio::test]
async fn test_acme_primary_only() {
    let out = pipeline(numbered(10), None).run(&acme(), false).await.unwrap();
    assert_eq!(out.questions.len(), 10);
    assert_eq!(out.method_used, MethodUsed::PrimaryOnly);
    assert_eq!(out.raw_questions, None);
    assert_eq!(out.questions[0], "How does Acme handle scenario number 1?");
}

#[tokio::test]
async fn test_always_exactly_ten() {
    for n in [0usize, 1, 2, 5, 8, 10, 15] {
        let primary = format!("{HEADER}\n{}", numbered(n));
        let out = pipeline(primary, None).run(&acme(), false).await.unwrap();
        assert_eq!(out.questions.len(), QUESTION_COUNT, "primary produced {n}");
    }
}

#[tokio::test]
async fn test_padding_uses_pool_in_order() {
    let primary = format!("{HEADER}\n{}", numbered(7));
    let out = pipeline(primary, None).run(&acme(), false).await.unwrap();
    assert_eq!(&out.questions[7..], &FALLBACK_QUESTIONS[..3]);
}

#[tokio::test]
async fn test_enhanced_set_of_eight_accepted() {
    let out = pipeline(
        numbered(10),
        Some(ScriptedEnhancer::always(
            (1..=8)
                .map(|i| format!("{i}. Refined question about unit economics {i}?\n"))
                .collect::<String>(),
        )),
    )
    .run(&acme(), true)
    .await
    .unwrap();
    assert_eq!(out.method_used, MethodUsed::PrimaryPlusEnhanced);
    assert_eq!(out.questions.len(), 10);
    assert!(out.questions[..8].iter().all(|q| q.starts_with("Refined")));
    assert_eq!(out.raw_questions.map(|r| r.len()), Some(10));
}

#[test]
fn test_parse_is_stable_on_clean_questions() {
    let clean = parse_questions(&numbered(6));
    let rejoined: String = clean
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}\n", i + 1, q))
        .collect();
    assert_eq!(parse_questions(&rejoined), clean);
}
