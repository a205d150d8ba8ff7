use crate::config::DEFAULT_REPLAY_TAG;
use crate::error::{ReplayError, Result};
use crate::observability::{get_metrics, mask_sensitive};
use crate::replay::cache::TaggedCache;
use crate::replay::record::ReplayRecord;
use crate::replay::stats::ReplayStats;
use http::Response;
use std::sync::Arc;

/// Stores finalized responses under idempotency keys and replays them.
///
/// Lookups and writes go to a [`TaggedCache`] under a single tag, so the
/// whole replay namespace can be flushed without touching other entries.
/// The store takes no locks: two requests racing on one key both run the
/// handler, and the later `save` wins.
#[derive(Clone)]
pub struct ReplayStore {
    cache: Arc<dyn TaggedCache>,
    tag: String,
    stats: Arc<ReplayStats>,
}

impl ReplayStore {
    pub fn new(cache: Arc<dyn TaggedCache>) -> Self {
        Self {
            cache,
            tag: DEFAULT_REPLAY_TAG.to_string(),
            stats: Arc::new(ReplayStats::new()),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn stats(&self) -> Arc<ReplayStats> {
        Arc::clone(&self.stats)
    }

    pub fn from_response(
        key: &str,
        request_hash: &str,
        response: &Response<String>,
    ) -> Result<ReplayRecord> {
        ReplayRecord::from_response(key, request_hash, response)
    }

    pub fn to_response(record: &ReplayRecord, request_hash: &str) -> Result<Response<String>> {
        record.to_response(request_hash)
    }

    /// Looks up the record stored at `key`.
    ///
    /// An entry that no longer deserializes is reported as absent; the next
    /// `save` for the key replaces it.
    pub async fn find(&self, key: &str) -> Result<Option<ReplayRecord>> {
        let record = self.load(key).await?;
        if record.is_some() {
            self.record_hit(key);
        }
        Ok(record)
    }

    /// Reads and decodes the entry at `key`. Misses and corrupt entries are
    /// counted here; hits are left to the caller.
    async fn load(&self, key: &str) -> Result<Option<ReplayRecord>> {
        let raw = match self.cache.get(&self.tag, key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.record_error();
                return Err(e);
            }
        };

        let Some(raw) = raw else {
            self.stats.record_miss();
            get_metrics().record_replay_lookup("miss");
            return Ok(None);
        };

        match serde_json::from_str::<ReplayRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                self.stats.record_corrupt();
                self.stats.record_miss();
                get_metrics().record_replay_lookup("corrupt");
                tracing::warn!(
                    key = %mask_sensitive(key, 4),
                    error = %e,
                    "Ignoring undeserializable replay record"
                );
                Ok(None)
            }
        }
    }

    fn record_hit(&self, key: &str) {
        self.stats.record_hit();
        get_metrics().record_replay_lookup("hit");
        tracing::debug!(key = %mask_sensitive(key, 4), "Replay record found");
    }

    /// Records a finalized response for later replay, replacing any previous
    /// record under `key`.
    pub async fn save(
        &self,
        key: &str,
        request_hash: &str,
        response: &Response<String>,
    ) -> Result<()> {
        let record = Self::from_response(key, request_hash, response)?;
        self.save_record(&record).await
    }

    pub async fn save_record(&self, record: &ReplayRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;

        if let Err(e) = self.cache.put(&self.tag, &record.key, &json).await {
            self.stats.record_error();
            return Err(e);
        }

        self.stats.record_save();
        get_metrics().record_replay_saved(record.status_code);
        tracing::debug!(
            key = %mask_sensitive(&record.key, 4),
            status = record.status_code,
            "Stored replay record"
        );
        Ok(())
    }

    /// Finds the record for `key` and rebuilds it for a request hashing to
    /// `request_hash`. `Ok(None)` means the caller should run the request.
    pub async fn replay(&self, key: &str, request_hash: &str) -> Result<Option<Response<String>>> {
        let Some(record) = self.load(key).await? else {
            return Ok(None);
        };

        if !record.matches(request_hash) {
            self.stats.record_conflict();
            get_metrics().record_replay_lookup("conflict");
            get_metrics().record_replay_conflict();
            tracing::info!(
                key = %mask_sensitive(key, 4),
                "Idempotency key reused with a different request"
            );
            return Err(ReplayError::Conflict { key: record.key });
        }

        self.record_hit(key);
        record.to_response(request_hash).map(Some)
    }

    /// Drops every record under this store's tag.
    pub async fn flush(&self) -> Result<u64> {
        self.cache.flush(&self.tag).await
    }
}
