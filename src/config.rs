use serde::Deserialize;

/// Cache namespace that replay records live under.
pub const DEFAULT_REPLAY_TAG: &str = "idempotency_requests";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub redis: RedisSettings,
    pub replay: ReplaySettings,
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// Falls back to the in-memory cache when unset.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    pub enabled: bool,
    /// Request header carrying the client's idempotency key.
    pub header_name: String,
    /// Response header marking a replayed response.
    pub replay_header_name: String,
    pub tag: String,
    pub key_prefix: String,
    /// TTL handed to the cache backend. Zero disables expiry.
    pub expiration_secs: u64,
    pub max_body_bytes: usize,
    /// Request headers that feed the request hash, in order.
    pub hashed_headers: Vec<String>,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "Idempotency-Key".to_string(),
            replay_header_name: "X-Is-Replay".to_string(),
            tag: DEFAULT_REPLAY_TAG.to_string(),
            key_prefix: "replay".to_string(),
            expiration_secs: 86400, // 24 hours
            max_body_bytes: 1024 * 1024,
            hashed_headers: vec!["authorization".to_string()],
        }
    }
}

impl ReplaySettings {
    pub fn ttl_seconds(&self) -> Option<u64> {
        (self.expiration_secs > 0).then_some(self.expiration_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("replay.hashed_headers")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}
