//! SQLite pool factory and module migration runner.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use shelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const LEDGER_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS _shelf_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Open a connection pool for the configured database.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never reaped.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if settings.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(
        target: "shelf-db",
        url = %settings.url,
        max_connections = pool.options().get_max_connections(),
        "database pool ready"
    );

    Ok(pool)
}

/// Apply every migration not yet recorded in the ledger; returns how many ran.
pub async fn migrate(pool: &SqlitePool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(LEDGER_DDL)
        .execute(pool)
        .await
        .context("failed to create migration ledger")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let recorded: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM _shelf_migrations WHERE module = ? AND id = ?")
                .bind(module.as_str())
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .context("failed to read migration ledger")?;

        if recorded.is_some() {
            tracing::debug!(target: "shelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.context("failed to open migration transaction")?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;

        sqlx::query("INSERT INTO _shelf_migrations (module, id) VALUES (?, ?)")
            .bind(module.as_str())
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .context("failed to record migration")?;

        tx.commit().await.context("failed to commit migration")?;

        tracing::info!(target: "shelf-db", %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
