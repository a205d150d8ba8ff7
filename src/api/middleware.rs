use axum::{
    body::{to_bytes, Body},
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::ReplaySettings;
use crate::error::{ReplayError, Result};
use crate::observability::{get_metrics, mask_sensitive, LatencyTimer};
use crate::replay::{
    parse_idempotency_key, DefaultReplayPolicy, ReplayPolicy, ReplayStore, RequestFingerprint,
    RequestHasher, Sha256RequestHasher,
};

/// Everything the replay middleware needs per request.
#[derive(Clone)]
pub struct ReplayState {
    pub store: ReplayStore,
    hasher: Arc<dyn RequestHasher>,
    policy: Arc<dyn ReplayPolicy>,
    header_name: HeaderName,
    replay_header_name: HeaderName,
    enabled: bool,
    max_body_bytes: usize,
}

impl ReplayState {
    pub fn from_settings(store: ReplayStore, settings: &ReplaySettings) -> Result<Self> {
        let header_name = parse_header_name(&settings.header_name)?;
        let replay_header_name = parse_header_name(&settings.replay_header_name)?;

        Ok(Self {
            store,
            hasher: Arc::new(Sha256RequestHasher::from_names(settings.hashed_headers.as_slice())),
            policy: Arc::new(DefaultReplayPolicy::new(header_name.clone())),
            header_name,
            replay_header_name,
            enabled: settings.enabled,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn RequestHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ReplayPolicy>) -> Self {
        self.policy = policy;
        self
    }
}

fn parse_header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ReplayError::Configuration(format!("invalid header name {:?}", name)))
}

/// Replays stored responses for repeated idempotency keys and records fresh
/// ones. Mount with `axum::middleware::from_fn_with_state`.
pub async fn replay_middleware(
    State(state): State<ReplayState>,
    request: Request,
    next: Next,
) -> Response {
    match handle(&state, request, next).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle(state: &ReplayState, request: Request, next: Next) -> Result<Response> {
    if !state.enabled
        || !state
            .policy
            .is_idempotent_request(request.method(), request.headers())
    {
        return Ok(next.run(request).await);
    }

    let key = match request.headers().get(&state.header_name) {
        Some(raw_key) => Some(parse_idempotency_key(raw_key)?),
        None => None,
    };
    let Some(key) = key else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| ReplayError::PayloadTooLarge {
            limit: state.max_body_bytes,
        })?;

    let request_hash = state
        .hasher
        .hash(&RequestFingerprint::from_parts(&parts, &bytes));

    if let Some(replayed) = state.store.replay(&key, &request_hash).await? {
        get_metrics().record_replay_served(replayed.status().as_u16());
        tracing::info!(
            key = %mask_sensitive(&key, 4),
            status = replayed.status().as_u16(),
            "Serving replayed response"
        );

        let mut response = replayed.map(Body::from);
        response
            .headers_mut()
            .insert(state.replay_header_name.clone(), HeaderValue::from_static("true"));
        return Ok(response);
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    record(state, &key, &request_hash, response).await
}

/// Buffers the handler's response and stores it when the policy allows.
/// A failed save is logged; the client still gets the fresh response.
async fn record(
    state: &ReplayState,
    key: &str,
    request_hash: &str,
    response: Response,
) -> Result<Response> {
    if !state.policy.is_recordable_response(response.status()) {
        get_metrics().record_replay_skipped("status");
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ReplayError::Internal(anyhow::anyhow!("Failed to buffer response body: {}", e)))?;

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let mut snapshot = http::Response::new(text.to_string());
            *snapshot.status_mut() = parts.status;
            *snapshot.headers_mut() = parts.headers.clone();

            match ReplayStore::from_response(key, request_hash, &snapshot) {
                Ok(replay_record) => {
                    if let Err(e) = state.store.save_record(&replay_record).await {
                        tracing::error!(
                            key = %mask_sensitive(key, 4),
                            error = %e,
                            "Failed to store response for replay"
                        );
                    }
                }
                Err(e) => {
                    get_metrics().record_replay_skipped("non_utf8_header");
                    tracing::debug!(
                        key = %mask_sensitive(key, 4),
                        error = %e,
                        "Response headers cannot be replayed exactly; not recorded"
                    );
                }
            }
        }
        Err(_) => {
            get_metrics().record_replay_skipped("non_utf8_body");
            tracing::debug!(key = %mask_sensitive(key, 4), "Response body is not UTF-8; not recorded");
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Records request counts and latency per matched route.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let timer = LatencyTimer::new();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    get_metrics().record_http_request(&method, &path, response.status().as_u16(), timer.elapsed_ms());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::InMemoryTaggedCache;

    #[test]
    fn test_from_settings_rejects_bad_header_name() {
        let store = ReplayStore::new(Arc::new(InMemoryTaggedCache::new()));
        let settings = ReplaySettings {
            header_name: "Idempotency Key".to_string(),
            ..ReplaySettings::default()
        };

        let err = ReplayState::from_settings(store, &settings).err().unwrap();
        assert!(matches!(err, ReplayError::Configuration(_)));
    }

    #[test]
    fn test_from_settings_parses_headers() {
        let store = ReplayStore::new(Arc::new(InMemoryTaggedCache::new()));
        let state = ReplayState::from_settings(store, &ReplaySettings::default()).unwrap();

        assert_eq!(state.header_name, "idempotency-key");
        assert_eq!(state.replay_header_name, "x-is-replay");
        assert!(state.enabled);
    }
}
