pub mod cache;
pub mod hasher;
pub mod policy;
pub mod record;
pub mod stats;
pub mod store;

pub use cache::{InMemoryTaggedCache, RedisTaggedCache, TaggedCache};
pub use hasher::{normalize_path, RequestFingerprint, RequestHasher, Sha256RequestHasher};
pub use policy::{parse_idempotency_key, DefaultReplayPolicy, ReplayPolicy, MAX_KEY_LENGTH};
pub use record::{snapshot_headers, HeaderSnapshot, ReplayRecord};
pub use stats::{ReplayStats, StatsSnapshot};
pub use store::ReplayStore;
