#![allow(dead_code)]

use axum::Router;
use http::Response;
use response_replay::replay::{InMemoryTaggedCache, ReplayStore};
use std::sync::Arc;

pub const TAG: &str = "idempotency_requests";

pub fn response(body: &str, status: u16, headers: &[(&str, &str)]) -> Response<String> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body.to_string()).expect("valid test response")
}

pub fn in_memory_store() -> (Arc<InMemoryTaggedCache>, ReplayStore) {
    let cache = Arc::new(InMemoryTaggedCache::new());
    let store = ReplayStore::new(cache.clone());
    (cache, store)
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_app(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}
