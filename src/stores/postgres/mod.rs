//! `PostgreSQL` store implementations.

mod audit;
mod item;
mod sale;

pub use audit::{BatchingAuditLog, PostgresAuditLog};
pub use item::PostgresItemStore;
pub use sale::PostgresSaleStore;

use crate::config::PostgresConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Open the shared connection pool.
///
/// Sized for the hot path: one short transaction per request under peak
/// concurrency, assuming the server's `max_connections` is in the 200-250
/// range.
///
/// # Errors
///
/// Returns error if the initial connection fails.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(150)
        .min_connections(50)
        .max_lifetime(Duration::from_secs(15 * 60))
        .connect(&config.url())
        .await?;

    Ok(pool)
}

/// Apply pending migrations from the `migrations/` directory.
///
/// # Errors
///
/// Returns error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::error::Error::Internal(format!("migration failed: {e}")))?;
    Ok(())
}
