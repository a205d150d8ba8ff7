use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const REDIS_TIMEOUT: Duration = Duration::from_secs(5);
const REDIS_SLOW_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy)
    }
}

/// Health of the replay cache backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
}

impl DependencyHealth {
    pub fn healthy(name: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    pub fn degraded(name: impl Into<String>, latency_ms: f64, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            latency_ms: Some(latency_ms),
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

impl AggregatedHealth {
    pub fn new(version: String, uptime_seconds: u64, dependencies: Vec<DependencyHealth>) -> Self {
        let status = if dependencies.iter().any(|d| d.status.is_unhealthy()) {
            HealthStatus::Unhealthy
        } else if dependencies.iter().all(|d| d.status.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            version,
            uptime_seconds,
            dependencies,
        }
    }
}

/// Reports on the cache backend replay records live in.
pub struct HealthChecker {
    redis_client: Option<redis::Client>,
    start_time: Instant,
}

impl HealthChecker {
    /// `None` means the process-local cache is in use.
    pub fn new(redis_client: Option<redis::Client>) -> Self {
        Self {
            redis_client,
            start_time: Instant::now(),
        }
    }

    pub async fn check_all(&self) -> AggregatedHealth {
        AggregatedHealth::new(
            env!("CARGO_PKG_VERSION").to_string(),
            self.uptime_seconds(),
            vec![self.check_cache().await],
        )
    }

    pub async fn check_cache(&self) -> DependencyHealth {
        let Some(client) = &self.redis_client else {
            return DependencyHealth::healthy("in_memory_cache", 0.0);
        };

        let start = Instant::now();
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => return DependencyHealth::unhealthy("redis", format!("Connection failed: {}", e)),
        };

        match tokio::time::timeout(REDIS_TIMEOUT, redis::cmd("PING").query_async::<_, ()>(&mut conn)).await {
            Ok(Ok(())) => {
                let latency = start.elapsed().as_secs_f64() * 1000.0;
                if latency > REDIS_SLOW_MS {
                    DependencyHealth::degraded("redis", latency, "High latency detected")
                } else {
                    DependencyHealth::healthy("redis", latency)
                }
            }
            Ok(Err(e)) => DependencyHealth::unhealthy("redis", format!("PING failed: {}", e)),
            Err(_) => DependencyHealth::unhealthy("redis", "PING timeout"),
        }
    }

    /// Ready while the cache can still serve lookups, even if slowly.
    pub async fn is_ready(&self) -> bool {
        !self.check_cache().await.status.is_unhealthy()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
