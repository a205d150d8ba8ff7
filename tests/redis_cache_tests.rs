mod common;

use response_replay::replay::{RedisTaggedCache, ReplayStore, TaggedCache};
use std::sync::Arc;
use uuid::Uuid;

fn redis_cache(prefix: &str) -> RedisTaggedCache {
    dotenvy::dotenv().ok();

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url).expect("Invalid Redis URL");
    RedisTaggedCache::new(client, prefix).with_ttl(Some(60))
}

fn unique_prefix() -> String {
    format!("replay-test-{}", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_redis_put_get_forget() {
    let cache = redis_cache(&unique_prefix());

    assert_eq!(cache.get(common::TAG, "k").await.unwrap(), None);

    cache.put(common::TAG, "k", "one").await.unwrap();
    cache.put(common::TAG, "k", "two").await.unwrap();
    assert_eq!(cache.get(common::TAG, "k").await.unwrap().as_deref(), Some("two"));

    assert!(cache.forget(common::TAG, "k").await.unwrap());
    assert_eq!(cache.get(common::TAG, "k").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_redis_flush_only_touches_its_tag() {
    let cache = redis_cache(&unique_prefix());

    for i in 0..3 {
        cache
            .put(common::TAG, &format!("k{}", i), "v")
            .await
            .unwrap();
    }
    cache.put("other", "k0", "kept").await.unwrap();

    assert_eq!(cache.flush(common::TAG).await.unwrap(), 3);
    assert_eq!(cache.get(common::TAG, "k1").await.unwrap(), None);
    assert_eq!(cache.get("other", "k0").await.unwrap().as_deref(), Some("kept"));

    cache.flush("other").await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_replay_store_over_redis() {
    let store = ReplayStore::new(Arc::new(redis_cache(&unique_prefix())));
    let original = common::response("test", 200, &[("header-1", "test")]);

    store.save("k", "hash", &original).await.unwrap();

    let record = store.find("k").await.unwrap().expect("record stored");
    assert_eq!(record.body, "test");
    assert_eq!(record.status_code, 200);
    assert_eq!(record.headers["header-1"], vec!["test".to_string()]);

    let replayed = store.replay("k", "hash").await.unwrap().unwrap();
    assert_eq!(replayed.headers(), original.headers());
    assert!(store.replay("k", "hash-2").await.unwrap_err().is_conflict());

    store.flush().await.unwrap();
}
