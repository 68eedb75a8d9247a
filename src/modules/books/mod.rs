//! Books module: catalogue CRUD and keyword search.

pub mod error;
pub mod guard;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_kernel::{InitCtx, Migration, Module};
use sqlx::SqlitePool;
use utoipa::OpenApi;

use repository::SqliteBookStore;
use service::BookService;

pub const BOOKS_MIGRATION: Migration = Migration {
    id: "001_create_books",
    up: r#"
        CREATE TABLE IF NOT EXISTS books (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            title            TEXT    NOT NULL CHECK (length(title) BETWEEN 1 AND 255),
            author           TEXT    NOT NULL CHECK (length(author) BETWEEN 1 AND 255),
            isbn             TEXT    NOT NULL,
            publication_date TEXT    NOT NULL,
            price            TEXT    NOT NULL,
            description      TEXT    CHECK (description IS NULL OR length(description) <= 1000),
            pages            INTEGER CHECK (pages IS NULL OR pages >= 0),
            publisher        TEXT    CHECK (publisher IS NULL OR length(publisher) <= 100),
            created_at       TEXT    NOT NULL,
            updated_at       TEXT    NOT NULL,
            version          INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_books_isbn ON books (isbn);
        CREATE INDEX IF NOT EXISTS idx_books_title ON books (title);
    "#,
};

pub struct BooksModule {
    service: Arc<BookService>,
}

impl BooksModule {
    pub fn new(pool: SqlitePool) -> Self {
        let store = Arc::new(SqliteBookStore::new(pool));
        Self {
            service: Arc::new(BookService::new(store)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<utoipa::openapi::OpenApi> {
        Some(routes::BooksApi::openapi())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![BOOKS_MIGRATION]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(pool))
}
