//! Environment-driven configuration.

use crate::infrastructure::retry::RetryPolicy;

/// Which version-store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Engine configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_host: String,
    pub server_port: u16,
    pub redis_url: String,
    pub namespace: String,
    pub store_backend: StoreBackend,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let server_port: u16 = std::env::var("SERVER_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .unwrap_or(3000);
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let namespace = std::env::var("PLAYVAULT_NAMESPACE").unwrap_or_else(|_| "user".into());

        // `memory` is for local development without a Redis instance.
        let store_backend = match std::env::var("PLAYVAULT_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Redis,
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: env_parse("OCC_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            base_delay_ms: env_parse("OCC_BASE_DELAY_MS", defaults.base_delay_ms),
            jitter_ceiling_ms: env_parse("OCC_JITTER_MS", defaults.jitter_ceiling_ms),
        };

        Self {
            server_host,
            server_port,
            redis_url,
            namespace,
            store_backend,
            retry,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
