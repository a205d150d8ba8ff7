use http::StatusCode;
use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors raised while storing or replaying idempotent responses.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The idempotency key was already used for a request with a different hash.
    #[error("Idempotency key {key} was reused for a different request")]
    Conflict { key: String },

    #[error("Invalid idempotency key: {0}")]
    InvalidKey(String),

    #[error("Request body exceeds the replay limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Response header {name} has a value that is not valid UTF-8")]
    NonUtf8Header { name: String },

    #[error("Failed to rebuild response: {0}")]
    Http(#[from] http::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReplayError {
    /// HTTP status the boundary layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReplayError::Conflict { .. } => StatusCode::CONFLICT,
            ReplayError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ReplayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ReplayError::Conflict { .. } => "IDEMPOTENCY_CONFLICT",
            ReplayError::InvalidKey(_) => "INVALID_IDEMPOTENCY_KEY",
            ReplayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ReplayError::Redis(_) => "STORAGE_ERROR",
            ReplayError::Serialization(_) => "SERIALIZATION_ERROR",
            ReplayError::NonUtf8Header { .. } => "UNREPRESENTABLE_RESPONSE",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ReplayError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let err = ReplayError::Conflict {
            key: "k".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "IDEMPOTENCY_CONFLICT");
        assert!(err.is_conflict());
        assert!(err.to_string().contains("reused for a different request"));
    }

    #[test]
    fn test_storage_errors_map_to_500() {
        let err = ReplayError::from(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            ReplayError::InvalidKey("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReplayError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
