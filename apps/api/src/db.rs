use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;

/// Connects to the managed Postgres backend and verifies the schema is reachable.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL (max {MAX_CONNECTIONS} connections)...");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    // Fails fast if migrations have not been applied.
    for table in ["proposals", "proposal_usage"] {
        sqlx::query(&format!("SELECT 1 FROM {table} LIMIT 1"))
            .execute(&pool)
            .await
            .with_context(|| format!("{table} table is missing; apply apps/api/migrations first"))?;
    }

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
