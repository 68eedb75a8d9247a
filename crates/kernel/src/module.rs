use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during the init and start phases
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Schema change contributed by a module.
///
/// `up` may contain several statements; it is applied once, inside a
/// transaction, and recorded under `(module name, id)`.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Lifecycle contract every feature module implements
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also its URL segment
    fn name(&self) -> &'static str;

    /// Called during application startup before migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Router for this module's routes, mounted under `/api/v1/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment nested under the module's mount path in the served document
    fn openapi(&self) -> Option<utoipa::openapi::OpenApi> {
        None
    }

    /// Migrations are executed in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called after migrations are complete
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
