//! Postgres access layer for patchrun.
//!
//! Pool construction and the connectivity probe live here; entity models are
//! under [`models`] and query code under [`repositories`]. The schema itself
//! is owned by the flow authoring subsystem, so the dispatcher never
//! migrates a production store; `db/migrations/` at the repo root mirrors
//! the surface for `#[sqlx::test]` runs.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod models;
pub mod repositories;

/// The dispatcher needs very few connections: one poll query plus a handful
/// of concurrent status writes.
const MAX_CONNECTIONS: u32 = 5;

/// Build a connection pool from a Postgres URL.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Cheap connectivity probe (`SELECT 1`).
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    tracing::debug!("Database health check passed");
    Ok(())
}
