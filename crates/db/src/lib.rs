//! Database layer for storebridge: models and repositories for
//! migration runs, the entity ledger, cancellation flags, and the
//! audit log.
//!
//! All repositories are stateless unit structs with associated async
//! functions taking a `&PgPool`; errors are `sqlx::Error` and are
//! classified at the API boundary.

pub mod models;
pub mod repositories;

use sqlx::PgPool;

/// Verify database connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Connect to the database using `DATABASE_URL`.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
