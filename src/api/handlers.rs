//! HTTP handlers and router assembly

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::models::{AskRequest, AskResponse, ErrorBody, HealthResponse};
use crate::error::OrchestratorError;
use crate::metrics::METRICS;
use crate::orchestrator::RequestOrchestrator;
use crate::time_operation;
use crate::SERVICE_VERSION;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
}

/// Answer a question
///
/// POST /ask
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorBody>)> {
    let Json(request) = payload.map_err(|e| {
        info!(error = %e, "Rejected request body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("No JSON data provided")),
        )
    })?;

    let result = time_operation!(
        METRICS.request_duration,
        "ask",
        state.orchestrator.handle(request).await
    );

    match result {
        Ok(response) => Ok(Json(response)),
        Err(OrchestratorError::InvalidRequest(message)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))))
        }
        Err(e) => {
            error!(error = %e, "Request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(format!("Internal server error: {}", e))),
            ))
        }
    }
}

/// Service health and feature summary
///
/// GET / and GET /ask
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        version: SERVICE_VERSION,
        message: "Knowledge Orchestrator v5 - Multi-source retrieval + intelligent synthesis",
        status: "healthy",
        synthesis_type: "llm_powered_multi_source_synthesis",
        features: vec![
            "Intent-based routing across JIRA, Confluence, GitHub, and Document360",
            "Keyword extraction with acronym expansion",
            "Dynamic date detection for sprint and release windows",
            "Concurrent backend queries with independent wait budgets",
            "Hybrid model selection with provider fallback",
            "Deterministic fallback responses when synthesis is unavailable",
            "Session management and conversation history",
            "JQL links with actual issue IDs",
            "Prometheus metrics at /metrics",
        ],
    })
}

/// Prometheus metrics export
///
/// GET /metrics
pub async fn metrics() -> String {
    METRICS.export_prometheus()
}

/// Build the service router
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ask", get(health).post(ask))
        .route("/metrics", get(metrics))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
