//! HTTP transport for the evaluator service
//!
//! Axum router over [`EvaluatorService`]. Errors render through
//! `EvaluatorError`'s `IntoResponse`; request counters are plain JSON under
//! `/system-info`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Request, State, rejection::JsonRejection},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{EvaluatorError, Result};
use crate::reports::{ReportLog, ReportRecord};
use crate::service::{
    CachedListing, CleanupReport, ClearedCache, EnhancerTestReport, EvaluationRequest,
    EvaluationResponse, EvaluatorService, HealthReport, QuestionRequest, QuestionResponse,
};

/// Shared state for HTTP server
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EvaluatorService>,
    pub reports: Option<Arc<ReportLog>>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl AppState {
    pub fn new(service: Arc<EvaluatorService>, reports: Option<Arc<ReportLog>>) -> Self {
        Self {
            service,
            reports,
            metrics: Arc::new(Mutex::new(HttpMetrics::default())),
        }
    }
}

/// Request counters for the HTTP surface
#[derive(Debug, Clone, Default)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub errors_total: u64,
    pub last_request_unix: u64,
    latencies: Vec<f64>, // ring buffer, most recent 256
}

impl HttpMetrics {
    fn record(&mut self, latency_ms: f64, failed: bool) {
        self.total_requests = self.total_requests.saturating_add(1);
        if failed {
            self.errors_total = self.errors_total.saturating_add(1);
        }
        self.latencies.push(latency_ms);
        if self.latencies.len() > 256 {
            self.latencies.remove(0);
        }
        self.last_request_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
    }

    pub fn avg_latency_ms(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        Some(self.latencies.iter().sum::<f64>() / self.latencies.len() as f64)
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| EvaluatorError::InvalidRequest {
            message: rejection.body_text(),
        })
}

pub async fn generate_questions_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>> {
    let request = json_body(payload)?;
    let response = state.service.generate_questions(&request).await?;
    Ok(Json(response))
}

pub async fn evaluate_startup_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EvaluationRequest>, JsonRejection>,
) -> Result<Json<EvaluationResponse>> {
    let request = json_body(payload)?;
    let response = state.service.evaluate_startup(&request).await?;

    if let Some(log) = &state.reports {
        let record = ReportRecord::new(&request, &response);
        if let Err(e) = log.append(&record).await {
            warn!("Failed to append report to {}: {}", log.path().display(), e);
        }
    }
    Ok(Json(response))
}

pub async fn list_cached_handler(State(state): State<AppState>) -> Json<CachedListing> {
    Json(state.service.list_cached())
}

pub async fn clear_cached_handler(State(state): State<AppState>) -> Json<ClearedCache> {
    Json(state.service.clear_cached())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health().await)
}

pub async fn test_enhancer_handler(State(state): State<AppState>) -> Json<EnhancerTestReport> {
    Json(state.service.test_enhancer().await)
}

pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupReport> {
    Json(state.service.cleanup().await)
}

pub async fn system_info_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let info = state.service.system_info().await;
    let metrics = state.metrics.lock().await.clone();

    let mut body = serde_json::to_value(&info)?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert(
            "http".to_string(),
            serde_json::json!({
                "total_requests": metrics.total_requests,
                "errors_total": metrics.errors_total,
                "last_request_unix": metrics.last_request_unix,
                "avg_latency_ms": metrics.avg_latency_ms(),
            }),
        );
    }
    Ok(Json(body))
}

async fn track_requests(
    State(metrics): State<Arc<Mutex<HttpMetrics>>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let resp = next.run(req).await;
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics
        .lock()
        .await
        .record(latency_ms, !resp.status().is_success());
    resp
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-questions", post(generate_questions_handler))
        .route("/evaluate-startup", post(evaluate_startup_handler))
        .route(
            "/cached-evaluations",
            get(list_cached_handler).delete(clear_cached_handler),
        )
        .route("/health", get(health_handler))
        .route("/test-enhancer", post(test_enhancer_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/system-info", get(system_info_handler))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState, bind: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
