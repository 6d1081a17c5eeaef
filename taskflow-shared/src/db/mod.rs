/// Database utilities: connection pooling and migrations

pub mod migrations;
pub mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DatabaseConfig};
