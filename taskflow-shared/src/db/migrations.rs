/// Database migration runner
///
/// Migrations live in the `migrations/` directory at the workspace root, one
/// `{timestamp}_{name}.sql` per change with a matching `.down.sql`.

use sqlx::postgres::PgPool;
use tracing::info;

/// Runs all pending database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("../migrations").run(pool).await?;
    info!("Database migrations up to date");
    Ok(())
}
