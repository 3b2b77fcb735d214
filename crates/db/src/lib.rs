//! Data-access layer for MemCard.
//!
//! All reads and writes go through a [`ScopedClient`] bound to the caller's
//! identity so row-level policies in Postgres apply. Multi-step mutations
//! are single stored-procedure calls (see `migrations/`), wrapped by the
//! typed repositories in [`repositories`].

pub mod backend;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod scoped;

use sqlx::postgres::PgPoolOptions;

pub use backend::{DataBackend, PgBackend, Select};
pub use error::DataError;
pub use memory::MemoryBackend;
pub use scoped::ScopedClient;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply schema, policies and stored procedures.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
