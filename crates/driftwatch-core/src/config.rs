//! Environment-driven service configuration.
//!
//! Every knob has a sensible default; invalid values log a warning and fall
//! back rather than failing startup. Logging verbosity is configured
//! separately through `RUST_LOG` (tracing's `EnvFilter`).

use std::time::Duration;

// ============================================================================
// Environment variable names
// ============================================================================

/// HTTP listen address (default: "0.0.0.0:8080")
pub const ENV_HTTP_ADDR: &str = "HTTP_ADDR";
/// Redis connection URL (default: "redis://redis:6379")
pub const ENV_REDIS_URL: &str = "REDIS_URL";
/// Ingest buffer capacity in samples (default: 1000)
pub const ENV_INGEST_BUFFER_SIZE: &str = "INGEST_BUFFER_SIZE";
/// Analyzer trailing window size in samples (default: 50)
pub const ENV_ANALYTICS_WINDOW_SIZE: &str = "ANALYTICS_WINDOW_SIZE";
/// Redis connect timeout in milliseconds (default: 2000)
pub const ENV_REDIS_CONNECT_TIMEOUT_MS: &str = "REDIS_CONNECT_TIMEOUT_MS";
/// Per-sample persistence deadline in milliseconds (default: 100)
pub const ENV_SAVE_TIMEOUT_MS: &str = "SAVE_TIMEOUT_MS";
/// TTL applied to persisted samples in seconds (default: 600)
pub const ENV_SAMPLE_TTL_SECS: &str = "SAMPLE_TTL_SECS";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address, `host:port`.
    pub http_addr: String,
    /// Redis connection URL for the persistence sink.
    pub redis_url: String,
    /// Ingest buffer capacity in samples.
    pub ingest_buffer_size: usize,
    /// Analyzer trailing window size in samples.
    pub analytics_window: usize,
    /// Redis connect timeout.
    pub redis_connect_timeout: Duration,
    /// Deadline for each best-effort persistence call.
    pub save_timeout: Duration,
    /// TTL applied to persisted samples.
    pub sample_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            redis_url: "redis://redis:6379".to_string(),
            ingest_buffer_size: crate::buffer::DEFAULT_INGEST_BUFFER_SIZE,
            analytics_window: crate::analyzer::DEFAULT_WINDOW_SIZE,
            redis_connect_timeout: Duration::from_secs(2),
            save_timeout: Duration::from_millis(100),
            sample_ttl: Duration::from_secs(600),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables use defaults; unparseable values log a warning and
    /// use defaults. Zero sizes are treated as unusable and also fall back.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_addr: env_string_or(ENV_HTTP_ADDR, &defaults.http_addr),
            redis_url: env_string_or(ENV_REDIS_URL, &defaults.redis_url),
            ingest_buffer_size: env_nonzero_usize_or(
                ENV_INGEST_BUFFER_SIZE,
                defaults.ingest_buffer_size,
            ),
            analytics_window: env_nonzero_usize_or(
                ENV_ANALYTICS_WINDOW_SIZE,
                defaults.analytics_window,
            ),
            redis_connect_timeout: env_duration_ms_or(
                ENV_REDIS_CONNECT_TIMEOUT_MS,
                defaults.redis_connect_timeout,
            ),
            save_timeout: env_duration_ms_or(ENV_SAVE_TIMEOUT_MS, defaults.save_timeout),
            sample_ttl: env_duration_secs_or(ENV_SAMPLE_TTL_SECS, defaults.sample_ttl),
        }
    }

    /// Set the HTTP listen address.
    #[must_use]
    pub fn with_http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Set the Redis connection URL.
    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    /// Set the ingest buffer capacity.
    #[must_use]
    pub fn with_ingest_buffer_size(mut self, size: usize) -> Self {
        self.ingest_buffer_size = size;
        self
    }

    /// Set the analyzer window size.
    #[must_use]
    pub fn with_analytics_window(mut self, size: usize) -> Self {
        self.analytics_window = size;
        self
    }

    /// Set the per-sample persistence deadline.
    #[must_use]
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = timeout;
        self
    }

    /// Set the TTL applied to persisted samples.
    #[must_use]
    pub fn with_sample_ttl(mut self, ttl: Duration) -> Self {
        self.sample_ttl = ttl;
        self
    }
}

fn env_string_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_nonzero_usize_or(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(v) => match v.parse::<usize>() {
            Ok(n) if n > 0 => n,
            Ok(_) => {
                tracing::warn!(var = key, value = %v, default, "must be > 0, using default");
                default
            }
            Err(e) => {
                tracing::warn!(var = key, value = %v, error = %e, default, "invalid integer, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_duration_ms_or(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(v) => match v.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(e) => {
                tracing::warn!(var = key, value = %v, error = %e, "invalid milliseconds, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_duration_secs_or(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(v) => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                tracing::warn!(var = key, value = %v, error = %e, "invalid seconds, using default");
                default
            }
        },
        Err(_) => default,
    }
}
