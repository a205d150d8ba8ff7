use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::api::responses::{ApiResponse, DetailedHealthResponse, EchoResponse, HealthResponse};
use crate::observability::{AggregatedHealth, HealthStatus};

use super::routes::AppState;

fn health_status_code(health: &AggregatedHealth) -> StatusCode {
    match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let health = state.health_checker.check_all().await;

    (
        health_status_code(&health),
        Json(ApiResponse::success(HealthResponse::from(&health))),
    )
}

/// Detailed health check with per-dependency status and latency.
pub async fn detailed_health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<DetailedHealthResponse>>) {
    let health = state.health_checker.check_all().await;
    let status = health_status_code(&health);

    let response = DetailedHealthResponse {
        timestamp: Utc::now(),
        health,
    };

    (status, Json(ApiResponse::success(response)))
}

/// Readiness check endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check endpoint.
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Echoes the JSON payload under a fresh id. Mounted behind the replay
/// middleware, so a retried request gets back the id of the first attempt.
pub async fn echo(Json(payload): Json<serde_json::Value>) -> (StatusCode, Json<ApiResponse<EchoResponse>>) {
    let response = EchoResponse {
        id: Uuid::new_v4(),
        received_at: Utc::now(),
        payload,
    };

    (StatusCode::CREATED, Json(ApiResponse::success(response)))
}
