//! Engine configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{EngineError, EngineResult};
use std::env;
use std::time::Duration;

/// Configuration for the read position sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on any single best-effort cache operation. Cache calls
    /// that exceed this are treated as cache failures (logged, not surfaced).
    pub cache_op_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_op_timeout: Duration::from_millis(250),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let cache_op_timeout =
            load_millis("FEEDMARK_CACHE_OP_TIMEOUT_MS", Self::default().cache_op_timeout)?;

        Ok(Self { cache_op_timeout })
    }
}

/// Configuration for personal feed creation retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum check-then-create attempts before giving up
    pub max_attempts: u32,
    /// Backoff between attempts grows as `base_delay * attempt`
    pub base_delay: Duration,
    /// Overall deadline across all attempts and backoff sleeps
    pub overall_deadline: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            overall_deadline: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let max_attempts = match env::var("FEEDMARK_CREATE_MAX_ATTEMPTS") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                EngineError::Config(format!(
                    "Invalid FEEDMARK_CREATE_MAX_ATTEMPTS: {}. Expected a positive integer",
                    raw
                ))
            })?,
            Err(_) => defaults.max_attempts,
        };

        if max_attempts == 0 {
            return Err(EngineError::Config(
                "FEEDMARK_CREATE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let base_delay = load_millis("FEEDMARK_CREATE_BASE_DELAY_MS", defaults.base_delay)?;
        let overall_deadline =
            load_millis("FEEDMARK_CREATE_DEADLINE_MS", defaults.overall_deadline)?;

        Ok(Self {
            max_attempts,
            base_delay,
            overall_deadline,
        })
    }
}

/// Read a millisecond duration from the environment, falling back to a default.
fn load_millis(var: &str, default: Duration) -> EngineResult<Duration> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                EngineError::Config(format!(
                    "Invalid {}: {}. Expected milliseconds as an integer",
                    var, raw
                ))
            }),
        Err(_) => Ok(default),
    }
}
