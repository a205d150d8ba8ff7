use crate::error::{ReplayError, Result};
use crate::observability::{get_metrics, LatencyTimer};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key-value store partitioned by a namespace tag.
///
/// Values are opaque strings; callers own serialization. Expiry and eviction
/// belong to the implementation.
#[async_trait]
pub trait TaggedCache: Send + Sync {
    async fn get(&self, tag: &str, key: &str) -> Result<Option<String>>;

    /// Stores `value`, replacing whatever was there.
    async fn put(&self, tag: &str, key: &str, value: &str) -> Result<()>;

    /// Removes one entry. Returns true if it existed.
    async fn forget(&self, tag: &str, key: &str) -> Result<bool>;

    /// Removes every entry under `tag`. Returns the number removed.
    async fn flush(&self, tag: &str) -> Result<u64>;
}

/// Process-local cache without expiry.
#[derive(Debug, Default)]
pub struct InMemoryTaggedCache {
    entries: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryTaggedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, tag: &str) -> usize {
        self.entries
            .read()
            .await
            .get(tag)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl TaggedCache for InMemoryTaggedCache {
    async fn get(&self, tag: &str, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(tag).and_then(|scope| scope.get(key)).cloned())
    }

    async fn put(&self, tag: &str, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn forget(&self, tag: &str, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(tag)
            .and_then(|scope| scope.remove(key))
            .is_some())
    }

    async fn flush(&self, tag: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(tag).map(|scope| scope.len() as u64).unwrap_or(0))
    }
}

/// Redis-backed tagged cache. Keys are laid out as `{prefix}:{tag}:{key}`;
/// tags may not contain `:`, which keeps that layout unambiguous.
pub struct RedisTaggedCache {
    client: redis::Client,
    key_prefix: String,
    ttl_seconds: Option<u64>,
}

impl RedisTaggedCache {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ttl_seconds: None,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: Option<u64>) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Rejects tags that would collide with the key layout.
    pub fn validate_tag(tag: &str) -> Result<()> {
        if tag.is_empty() || tag.contains(':') {
            return Err(ReplayError::Configuration(format!(
                "replay cache tag {:?} must be non-empty and must not contain ':'",
                tag
            )));
        }
        Ok(())
    }

    fn make_key(&self, tag: &str, key: &str) -> Result<String> {
        Self::validate_tag(tag)?;
        Ok(format!("{}:{}:{}", self.key_prefix, tag, key))
    }

    /// `SCAN MATCH` pattern covering every key under `tag`, with glob
    /// characters in the prefix and tag matched literally.
    fn scan_pattern(&self, tag: &str) -> Result<String> {
        Self::validate_tag(tag)?;
        Ok(format!(
            "{}:{}:*",
            escape_glob(&self.key_prefix),
            escape_glob(tag)
        ))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn observe<T>(operation: &str, timer: &LatencyTimer, result: &Result<T>) {
        let success = result.is_ok();
        get_metrics().record_cache_operation(operation, timer.elapsed_ms(), success);
        if let Err(e) = result {
            tracing::warn!(operation, error = %e, "Redis replay cache operation failed");
        }
    }
}

#[async_trait]
impl TaggedCache for RedisTaggedCache {
    async fn get(&self, tag: &str, key: &str) -> Result<Option<String>> {
        let timer = LatencyTimer::new();
        let result: Result<Option<String>> = async {
            let redis_key = self.make_key(tag, key)?;
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(redis_key).await?;
            Ok(value)
        }
        .await;

        Self::observe("get", &timer, &result);
        result
    }

    async fn put(&self, tag: &str, key: &str, value: &str) -> Result<()> {
        let timer = LatencyTimer::new();
        let result: Result<()> = async {
            let redis_key = self.make_key(tag, key)?;
            let mut conn = self.connection().await?;
            match self.ttl_seconds {
                Some(ttl) => conn.set_ex::<_, _, ()>(&redis_key, value, ttl).await?,
                None => conn.set::<_, _, ()>(&redis_key, value).await?,
            }
            Ok(())
        }
        .await;

        Self::observe("put", &timer, &result);
        result
    }

    async fn forget(&self, tag: &str, key: &str) -> Result<bool> {
        let timer = LatencyTimer::new();
        let result: Result<bool> = async {
            let redis_key = self.make_key(tag, key)?;
            let mut conn = self.connection().await?;
            let deleted: i64 = conn.del(redis_key).await?;
            Ok(deleted > 0)
        }
        .await;

        Self::observe("forget", &timer, &result);
        result
    }

    async fn flush(&self, tag: &str) -> Result<u64> {
        let timer = LatencyTimer::new();
        let result: Result<u64> = async {
            let pattern = self.scan_pattern(tag)?;
            let mut conn = self.connection().await?;
            let mut removed: u64 = 0;
            let mut cursor: u64 = 0;
            loop {
                let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(100)
                    .query_async(&mut conn)
                    .await?;

                if !keys.is_empty() {
                    let deleted: i64 = conn.del(&keys).await?;
                    removed += deleted as u64;
                }

                cursor = next_cursor;
                if cursor == 0 {
                    break;
                }
            }
            Ok(removed)
        }
        .await;

        Self::observe("flush", &timer, &result);
        if let Ok(count) = &result {
            tracing::debug!(tag, count, "Flushed replay cache tag");
        }
        result
    }
}

fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
