//! HTTP surface, driven in-process through the axum router

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use startup_evaluator::clients::{Enhancer, ScriptedEnhancer, ScriptedGenerator};
use startup_evaluator::http::{AppState, router};
use startup_evaluator::service::EvaluatorService;
use tower::ServiceExt;

const QUESTIONS: &str = "1. What is your monthly recurring revenue?\n\
                         2. How do you acquire your first hundred customers?\n\
                         3. Who on the team has shipped a regulated product?";

const REPORT: &str = "STARTUP EVALUATION REPORT\n\
                      1. Problem-Solution Fit: 7/10 — Real pain. Strength: clear buyer. Weakness: long sales cycle. Improvement: shorten pilots.\n\
                      2. Team Strength & Experience: 9/10 — Seasoned founders. Strength: domain depth. Weakness: no CFO. Improvement: hire finance lead.\n\
                      Overall Assessment: invest with milestones.";

fn app(enhancer: Option<ScriptedEnhancer>) -> Router {
    let service = EvaluatorService::new(
        Arc::new(ScriptedGenerator::always(QUESTIONS)),
        Arc::new(ScriptedGenerator::always(
            "The answers show traction but little detail on unit economics or churn.",
        )),
        enhancer.map(|e| Arc::new(e) as Arc<dyn Enhancer>),
    );
    router(AppState::new(Arc::new(service), None))
}

fn profile() -> Value {
    json!({
        "name": "Acme",
        "industry": "FinTech",
        "pitch": "Automated invoice reconciliation for small businesses.",
        "founded_year": 2021,
        "funding": "Seed"
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_generate_questions_primary_only() {
    let app = app(None);
    let mut body = profile();
    body["enhance_with_secondary"] = json!(false);

    let (status, json) = send(&app, "POST", "/generate-questions", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 10);
    assert_eq!(json["questions"].as_array().unwrap().len(), 10);
    assert_eq!(json["method_used"], "primary_only");
    assert!(json["raw_questions"].is_null());
}

#[tokio::test]
async fn test_invalid_year_is_client_error() {
    let app = app(None);
    let mut body = profile();
    body["founded_year"] = json!("1850");

    let (status, json) = send(&app, "POST", "/generate-questions", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], 400);
    assert!(json["error"]["details"].as_str().unwrap().contains("1850"));
}

#[tokio::test]
async fn test_evaluate_then_list_and_clear_cache() {
    let app = app(Some(ScriptedEnhancer::always(REPORT)));
    let body = json!({
        "startup": profile(),
        "questions": ["Q1?", "Q2?", "Q3?", "Q4?", "Q5?"],
        "answers": ["A1", "A2", "A3", "A4", "A5"]
    });

    let (status, json) = send(&app, "POST", "/evaluate-startup", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["method_used"], "primary_plus_enhanced");
    assert_eq!(json["overall_score"], 80);
    assert_eq!(json["criteria"].as_array().unwrap().len(), 2);
    assert_eq!(json["questions_used"].as_array().unwrap().len(), 5);
    assert!(json["raw_evaluation"].as_str().unwrap().contains("unit economics"));

    let (_, listed) = send(&app, "GET", "/cached-evaluations", None).await;
    assert_eq!(listed["count"], 1);
    assert!(
        listed["cached_evaluations"][0]["key"]
            .as_str()
            .unwrap()
            .starts_with("Acme_")
    );

    let (_, cleared) = send(&app, "DELETE", "/cached-evaluations", None).await;
    assert_eq!(cleared["cleared"], 1);

    let (_, listed) = send(&app, "GET", "/cached-evaluations", None).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn test_mismatched_answers_rejected() {
    let app = app(None);
    let body = json!({
        "startup": profile(),
        "questions": ["Q1?", "Q2?", "Q3?", "Q4?", "Q5?"],
        "answers": ["A1", "A2"]
    });
    let (status, json) = send(&app, "POST", "/evaluate-startup", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn test_operational_endpoints() {
    let app = app(None);

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["enhancer"]["configured"], false);

    let (_, probe) = send(&app, "POST", "/test-enhancer", None).await;
    assert_eq!(probe["status"], "error");

    let (_, cleanup) = send(&app, "POST", "/cleanup", None).await;
    assert_eq!(cleanup["models_released"], true);

    let (_, info) = send(&app, "GET", "/system-info", None).await;
    assert_eq!(info["cached_evaluations"], 0);
    assert_eq!(info["endpoints"].as_array().unwrap().len(), 8);
    assert!(info["http"]["total_requests"].as_u64().unwrap() >= 3);
}
