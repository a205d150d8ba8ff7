use crate::error::{ReplayError, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// Longest idempotency key accepted from a client.
pub const MAX_KEY_LENGTH: usize = 255;

/// Decides which requests take part in replay and which responses are kept.
pub trait ReplayPolicy: Send + Sync {
    fn is_idempotent_request(&self, method: &Method, headers: &HeaderMap) -> bool;

    fn is_recordable_response(&self, status: StatusCode) -> bool;
}

/// Replays non-idempotent methods that carry the key header, and records
/// successes and server errors. Client errors are left unrecorded so the
/// client can fix the request and retry under the same key.
#[derive(Debug, Clone)]
pub struct DefaultReplayPolicy {
    header_name: HeaderName,
}

impl DefaultReplayPolicy {
    pub fn new(header_name: HeaderName) -> Self {
        Self { header_name }
    }
}

impl ReplayPolicy for DefaultReplayPolicy {
    fn is_idempotent_request(&self, method: &Method, headers: &HeaderMap) -> bool {
        !method.is_idempotent() && headers.contains_key(&self.header_name)
    }

    fn is_recordable_response(&self, status: StatusCode) -> bool {
        status.is_success() || status.is_server_error()
    }
}

/// Validates a raw key header and returns the trimmed key.
pub fn parse_idempotency_key(value: &HeaderValue) -> Result<String> {
    let key = value
        .to_str()
        .map_err(|_| ReplayError::InvalidKey("key must be visible ASCII".to_string()))?
        .trim();

    if key.is_empty() {
        return Err(ReplayError::InvalidKey("key must not be empty".to_string()));
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(ReplayError::InvalidKey(format!(
            "key must be at most {} characters",
            MAX_KEY_LENGTH
        )));
    }

    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DefaultReplayPolicy {
        DefaultReplayPolicy::new(HeaderName::from_static("idempotency-key"))
    }

    fn with_key() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("idempotency-key", HeaderValue::from_static("abc"));
        headers
    }

    #[test]
    fn test_only_non_idempotent_methods_with_key() {
        let policy = policy();

        assert!(policy.is_idempotent_request(&Method::POST, &with_key()));
        assert!(policy.is_idempotent_request(&Method::PATCH, &with_key()));
        assert!(!policy.is_idempotent_request(&Method::GET, &with_key()));
        assert!(!policy.is_idempotent_request(&Method::PUT, &with_key()));
        assert!(!policy.is_idempotent_request(&Method::DELETE, &with_key()));
        assert!(!policy.is_idempotent_request(&Method::POST, &HeaderMap::new()));
    }

    #[test]
    fn test_recordable_statuses() {
        let policy = policy();

        assert!(policy.is_recordable_response(StatusCode::OK));
        assert!(policy.is_recordable_response(StatusCode::CREATED));
        assert!(policy.is_recordable_response(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.is_recordable_response(StatusCode::BAD_REQUEST));
        assert!(!policy.is_recordable_response(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(!policy.is_recordable_response(StatusCode::MOVED_PERMANENTLY));
    }

    #[test]
    fn test_parse_idempotency_key() {
        assert_eq!(
            parse_idempotency_key(&HeaderValue::from_static("  order-42 ")).unwrap(),
            "order-42"
        );
        assert!(parse_idempotency_key(&HeaderValue::from_static("   ")).is_err());

        let long = "k".repeat(MAX_KEY_LENGTH + 1);
        let err = parse_idempotency_key(&HeaderValue::from_str(&long).unwrap()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let opaque = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        assert!(parse_idempotency_key(&opaque).is_err());
    }
}
