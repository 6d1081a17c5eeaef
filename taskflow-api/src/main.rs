//! # TaskFlow API Server
//!
//! REST API for collaborative task management: users with role-based
//! access, tasks with comments, favorites and file attachments, an
//! append-only activity log, and realtime/email notification fan-out.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskflow-api
//! ```

use taskflow_api::{
    app::{build_router, AppState},
    clients::{mailer_from_config, HttpObjectStore},
    config::Config,
};
use std::sync::Arc;
use taskflow_shared::db;
use taskflow_shared::realtime::{client::RedisConfig, Notifier, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskFlow API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = db::create_pool(db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let notifier = match &config.redis.url {
        Some(url) => {
            let client = RedisClient::new(RedisConfig { url: url.clone() }).await?;
            tracing::info!("Realtime notifier connected");
            Notifier::new(client)
        }
        None => {
            tracing::warn!("REDIS_URL not set, realtime notifications disabled");
            Notifier::disabled()
        }
    };

    let mailer = mailer_from_config(&config.email);
    let storage = Arc::new(HttpObjectStore::new(&config.storage));

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config, mailer, storage, notifier);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
