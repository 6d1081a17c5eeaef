/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 bytes (required)
/// - `API_HOST` / `API_PORT`: Bind address (default 0.0.0.0:3000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default "*")
/// - `PRODUCTION`: Enables HSTS and strict CORS (default false)
/// - `REDIS_URL`: Realtime fan-out; notifier is disabled when unset
/// - `EMAIL_API_URL` / `EMAIL_API_KEY`: Transactional email HTTP API;
///   email sending is disabled when unset
/// - `EMAIL_FROM`: Sender address (default noreply@taskflow.local)
/// - `FRONTEND_URL`: Base URL used in email links (default http://localhost:3001)
/// - `STORAGE_ENDPOINT` / `STORAGE_BUCKET` / `STORAGE_API_TOKEN`: Object
///   storage for file attachments
///
/// # Example
///
/// ```no_run
/// use taskflow_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Listening on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; "*" means permissive (development)
    pub cors_origins: Vec<String>,

    /// Production mode: enables HSTS
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing; must be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Realtime fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL; notifier runs disabled when None
    pub url: Option<String>,
}

/// Transactional email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// HTTP API endpoint of the mail provider; sending disabled when None
    pub api_url: Option<String>,

    /// Bearer key for the mail provider
    pub api_key: Option<String>,

    /// Sender address
    pub from: String,

    /// Base URL for links embedded in emails
    pub frontend_url: String,
}

/// Object storage configuration for file attachments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base endpoint of the S3-compatible store
    pub endpoint: String,

    /// Bucket (path prefix) for uploads
    pub bucket: String,

    /// Optional bearer token for the store
    pub api_token: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when required variables are missing or invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("PRODUCTION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok(),
            },
            email: EmailConfig {
                api_url: env::var("EMAIL_API_URL").ok(),
                api_key: env::var("EMAIL_API_KEY").ok(),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "noreply@taskflow.local".to_string()),
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            },
            storage: StorageConfig {
                endpoint: env::var("STORAGE_ENDPOINT")
                    .unwrap_or_else(|_| "http://127.0.0.1:9000".to_string()),
                bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "taskflow".to_string()),
                api_token: env::var("STORAGE_API_TOKEN").ok(),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
