//! Postgres client factory, migration tooling, and the library repository.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
pub use sqlx::PgPool;

use shelf_kernel::{settings::DatabaseSettings, Migration};

pub mod library;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use library::{
    BookSummary, EntryUpdate, LibraryEntry, LibraryRepository, ReadingStatus, RepositoryError,
    ShelfBook,
};
pub use memory::InMemoryLibraryRepository;
pub use postgres::PgLibraryRepository;

/// Open a connection pool for the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let url = settings
        .url
        .as_deref()
        .context("database.url is not configured")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(url)
        .await
        .context("failed to connect to database")?;

    tracing::info!(
        target: "shelf-db",
        max_connections = settings.max_connections,
        "database pool established"
    );
    Ok(pool)
}

/// Apply module migrations that have not run yet, in the given order.
///
/// Applied migrations are recorded in `schema_migrations` keyed by
/// `(module, id)`; each migration runs in its own transaction.
pub async fn migrate(pool: &PgPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            module     TEXT        NOT NULL,
            id         TEXT        NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (module, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create schema_migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<(String,)> =
            sqlx::query_as("SELECT id FROM schema_migrations WHERE module = $1 AND id = $2")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read migration state for {module}"))?;

        if already.is_some() {
            tracing::debug!(target: "shelf-db", module = %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.context("failed to open transaction")?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {module}/{}", migration.id))?;
        tx.commit().await.context("failed to commit migration")?;

        tracing::info!(target: "shelf-db", module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
