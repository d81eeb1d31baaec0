/// Redis client wrapper with connection pooling and health checks
///
/// Wraps `redis::aio::ConnectionManager`, which handles reconnection
/// automatically. Configuration comes from `REDIS_HOST` / `REDIS_PORT`
/// environment variables.
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::cache::client::{CacheClient, CacheConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = CacheConfig::from_env()?;
/// let client = CacheClient::new(config).await?;
///
/// let healthy = client.ping().await?;
/// println!("Redis healthy: {}", healthy);
/// # Ok(())
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Cache client errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    /// Command execution error
    #[error("Redis command error: {0}")]
    CommandError(String),

    /// Configuration error
    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    /// Health check failed
    #[error("Redis health check failed: {0}")]
    HealthCheckFailed(String),

    /// Cached payload could not be serialized or parsed
    #[error("Cache serialization error: {0}")]
    SerializationError(String),
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => CacheError::ConnectionError(format!("IO error: {}", err)),
            _ => CacheError::CommandError(err.to_string()),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis host
    pub host: String,

    /// Redis port
    pub port: u16,

    /// Command timeout in seconds
    pub command_timeout_secs: u64,
}

impl CacheConfig {
    /// Creates a cache configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `REDIS_HOST`: Redis hostname (required)
    /// - `REDIS_PORT`: Redis port (default: 6379)
    /// - `REDIS_COMMAND_TIMEOUT_SECS`: command timeout (default: 10)
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_HOST` is not set or `REDIS_PORT` is
    /// not a valid port number.
    pub fn from_env() -> Result<Self, CacheError> {
        dotenvy::dotenv().ok();

        let host = env::var("REDIS_HOST").map_err(|_| {
            CacheError::ConfigError("REDIS_HOST environment variable is required".to_string())
        })?;

        let port = env::var("REDIS_PORT")
            .unwrap_or_else(|_| "6379".to_string())
            .parse::<u16>()
            .map_err(|_| CacheError::ConfigError("REDIS_PORT must be a port number".to_string()))?;

        let command_timeout_secs = env::var("REDIS_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            host,
            port,
            command_timeout_secs,
        })
    }

    /// Builds the Redis connection URL
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }

    /// Creates a default configuration for testing
    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            command_timeout_secs: 10,
        }
    }
}

/// Redis client with automatic reconnection
///
/// Thread-safe and cheap to clone (ConnectionManager is Arc-backed).
#[derive(Clone)]
pub struct CacheClient {
    manager: ConnectionManager,
    config: Arc<CacheConfig>,
}

impl CacheClient {
    /// Creates a new cache client
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL is invalid or the initial
    /// connection fails.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url())
            .map_err(|e| CacheError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!("Redis client connected to {}", config.url());

        Ok(Self {
            manager,
            config: Arc::new(config),
        })
    }

    /// Performs a health check by sending a PING command
    ///
    /// # Returns
    ///
    /// `true` if Redis responds with PONG, `false` otherwise.
    pub async fn ping(&self) -> Result<bool, CacheError> {
        let mut conn = self.manager.clone();

        let result: Result<String, RedisError> = tokio::time::timeout(
            Duration::from_secs(self.config.command_timeout_secs),
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| CacheError::HealthCheckFailed("PING command timed out".to_string()))?;

        match result {
            Ok(pong) if pong == "PONG" => Ok(true),
            Ok(other) => {
                tracing::warn!("Redis health check: unexpected response: {}", other);
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Redis health check failed: {}", e);
                Err(CacheError::HealthCheckFailed(e.to_string()))
            }
        }
    }

    /// Gets a connection handle
    ///
    /// The connection manager handles reconnection, so this always returns
    /// a usable handle.
    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Gets the client configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_url() {
        let config = CacheConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            command_timeout_secs: 10,
        };

        assert_eq!(config.url(), "redis://cache.internal:6380");
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_cache_client_creation() {
        let config = CacheConfig::default_for_test();
        let client = CacheClient::new(config).await;
        assert!(client.is_ok(), "Failed to create cache client");
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_cache_ping() {
        let config = CacheConfig::default_for_test();
        let client = CacheClient::new(config).await.unwrap();
        assert!(client.ping().await.unwrap());
    }
}
