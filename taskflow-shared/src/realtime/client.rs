/// Redis client wrapper used by the realtime notifier
///
/// Thin wrapper over `redis::aio::ConnectionManager` that handles automatic
/// reconnection, plus configuration from environment variables and a PING
/// health check.
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::realtime::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::from_env()?;
/// let client = RedisClient::new(config).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::Client;
use std::env;
use thiserror::Error;

/// Redis client errors
#[derive(Error, Debug)]
pub enum RedisClientError {
    /// Connection error
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    /// Command execution error
    #[error("Redis command error: {0}")]
    CommandError(String),

    /// Configuration error
    #[error("Redis configuration error: {0}")]
    ConfigError(String),
}

impl From<redis::RedisError> for RedisClientError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                RedisClientError::ConnectionError(format!("IO error: {}", err))
            }
            _ => RedisClientError::CommandError(err.to_string()),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL, e.g. redis://localhost:6379
    pub url: String,
}

impl RedisConfig {
    /// Loads configuration from the `REDIS_URL` environment variable
    pub fn from_env() -> Result<Self, RedisClientError> {
        dotenvy::dotenv().ok();

        let url = env::var("REDIS_URL").map_err(|_| {
            RedisClientError::ConfigError("REDIS_URL environment variable is required".to_string())
        })?;

        Ok(Self { url })
    }
}

/// Redis client with a managed (auto-reconnecting) connection
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Connects to Redis and establishes the managed connection
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(e.to_string()))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| RedisClientError::ConnectionError(e.to_string()))?;

        Ok(Self { manager })
    }

    /// Health check via PING
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }

    /// Publishes a message to a channel, returning the receiver count
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<i64, RedisClientError> {
        let mut conn = self.manager.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(receivers)
    }
}
