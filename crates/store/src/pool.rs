//! SQLite connection pool.

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::StoreError;

/// Type alias for the shared SQLite pool used by every SQL-backed query.
pub type DbPool = SqlitePool;

/// Create a new connection pool from the given `database_url`.
///
/// `max_connections` controls the pool ceiling.  Connections are never
/// recycled, so a `sqlite::memory:` database lives as long as the pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, StoreError> {
    info!("Connecting to database (max_connections={})", max_connections);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded in `migrator` (usually built with
/// `sqlx::migrate!`).
pub async fn run_migrations(pool: &DbPool, migrator: &Migrator) -> Result<(), StoreError> {
    info!("Running database migrations");
    migrator.run(pool).await?;
    Ok(())
}
