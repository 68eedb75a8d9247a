//! Application lifecycle: connect, register, migrate, serve, shut down.

use anyhow::Context;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// Connect the pool, register and initialize every module, then apply
/// pending migrations.
pub async fn prepare(settings: &Settings) -> anyhow::Result<(ModuleRegistry, SqlitePool)> {
    let pool = shelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &pool);
    tracing::info!(modules = registry.module_count(), "modules registered");

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;

    let applied = shelf_db::migrate(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations complete");

    Ok((registry, pool))
}

/// Apply pending migrations and exit; returns how many ran
pub async fn migrate_only(settings: &Settings) -> anyhow::Result<usize> {
    let pool = shelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &pool);

    let applied = shelf_db::migrate(&pool, &registry.collect_migrations()).await;
    pool.close().await;
    applied
}

/// Full bootstrap: serve HTTP until a shutdown signal arrives
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "shelf bootstrap starting"
    );

    let (registry, pool) = prepare(settings).await?;

    let ctx = InitCtx { settings };
    registry.start_modules(&ctx).await?;

    let served = shelf_http::start_server(&registry, settings).await;

    registry
        .stop_modules()
        .await
        .context("failed to stop modules")?;
    pool.close().await;

    tracing::info!("shelf shut down");
    served
}
