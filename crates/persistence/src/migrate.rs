//! Connection pool setup and schema migrations.

use std::path::Path;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::error::Result;

/// Opens a PostgreSQL pool.
pub async fn connect(database_uri: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_uri)
        .await?;
    Ok(pool)
}

/// Applies every pending migration found in `source`.
///
/// The directory is read at runtime so deployments can ship migrations
/// next to the binary.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool, source: &Path) -> Result<()> {
    let migrator = Migrator::new(source).await?;
    migrator.run(pool).await?;
    tracing::info!(count = migrator.iter().count(), "migrations applied");
    Ok(())
}
