use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReplayError;
use crate::observability::{AggregatedHealth, HealthStatus};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ReplayError> for ErrorResponse {
    fn from(error: &ReplayError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Replay handling failed");
        }

        let body = ApiResponse::<()>::error(ErrorResponse::from(&self));
        (status, Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&AggregatedHealth> for HealthResponse {
    fn from(health: &AggregatedHealth) -> Self {
        Self {
            status: health.status,
            version: health.version.clone(),
            uptime_seconds: health.uptime_seconds,
            timestamp: Utc::now(),
        }
    }
}

/// Health report including every dependency check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub health: AggregatedHealth,
}

/// Payload returned by the echo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_api_response_success_serialization() {
        let response: ApiResponse<String> = ApiResponse::success("test data".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"data\":\"test data\""));
    }

    #[test]
    fn test_conflict_error_response() {
        let response = ReplayError::Conflict {
            key: "k".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_error_response_from_replay_error() {
        let error = ErrorResponse::from(&ReplayError::InvalidKey("key must not be empty".into()));
        assert_eq!(error.code, "INVALID_IDEMPOTENCY_KEY");
        assert_eq!(error.message, "Invalid idempotency key: key must not be empty");
    }
}
