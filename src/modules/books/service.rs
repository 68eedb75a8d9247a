use std::sync::Arc;

use thiserror::Error;
use time::{Date, OffsetDateTime};

use super::guard::IsbnGuard;
use super::models::{merge, BookRequest, BookResponse};
use super::repository::{BookStore, StoreError};
use super::validation::{validate, Violation};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Validation failed for one or more fields")]
    ValidationFailed(Vec<Violation>),

    #[error("A book with ISBN '{0}' already exists")]
    DuplicateIsbn(String),

    #[error("Book not found with ID: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for BookError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateIsbn { isbn } => BookError::DuplicateIsbn(isbn),
            StoreError::Missing { id } => BookError::NotFound(id),
            other => BookError::Storage(other),
        }
    }
}

fn utc_today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Book use cases: validation, ISBN uniqueness and persistence.
///
/// Holds no state of its own besides the store handle, so one instance is
/// shared by every request.
pub struct BookService {
    store: Arc<dyn BookStore>,
    today: fn() -> Date,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self::with_clock(store, utc_today)
    }

    /// Use `today` as the reference date for the publication-date rule
    pub fn with_clock(store: Arc<dyn BookStore>, today: fn() -> Date) -> Self {
        Self { store, today }
    }

    fn guard(&self) -> IsbnGuard<'_> {
        IsbnGuard::new(self.store.as_ref())
    }

    pub async fn create(&self, request: BookRequest) -> Result<BookResponse, BookError> {
        tracing::debug!(isbn = ?request.isbn, "creating book");

        let book = validate(&request, (self.today)()).map_err(BookError::ValidationFailed)?;
        self.guard().ensure_creatable(&book.isbn).await?;

        let saved = self.store.insert(book).await?;

        tracing::info!(book_id = saved.id, isbn = %saved.isbn, "book created");
        Ok(saved.into())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<BookResponse, BookError> {
        tracing::debug!(book_id = id, "retrieving book");

        let book = self.store.find_by_id(id).await?.ok_or(BookError::NotFound(id))?;
        Ok(book.into())
    }

    pub async fn get_all(&self) -> Result<Vec<BookResponse>, BookError> {
        tracing::debug!("retrieving all books");

        let books = self.store.find_all().await?;
        tracing::debug!(count = books.len(), "books retrieved");
        Ok(books.into_iter().map(Into::into).collect())
    }

    /// Apply `request` onto the stored book; absent optional fields are kept
    pub async fn update(&self, id: i64, request: BookRequest) -> Result<BookResponse, BookError> {
        tracing::debug!(book_id = id, "updating book");

        let existing = self.store.find_by_id(id).await?.ok_or(BookError::NotFound(id))?;
        let checked = validate(&request, (self.today)()).map_err(BookError::ValidationFailed)?;

        if checked.isbn != existing.isbn {
            self.guard().ensure_updatable(&checked.isbn, id).await?;
        }

        let updated = self.store.update(merge(existing, &request)).await?;

        tracing::info!(book_id = id, version = updated.version, "book updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookError> {
        tracing::debug!(book_id = id, "deleting book");

        if self.store.find_by_id(id).await?.is_none() {
            return Err(BookError::NotFound(id));
        }
        self.store.delete_by_id(id).await?;

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    pub async fn search_by_title(&self, keyword: &str) -> Result<Vec<BookResponse>, BookError> {
        tracing::debug!(%keyword, "searching books by title");

        let books = self.store.search_by_title(keyword).await?;
        tracing::debug!(count = books.len(), %keyword, "title search finished");
        Ok(books.into_iter().map(Into::into).collect())
    }

    pub async fn search_by_author(&self, keyword: &str) -> Result<Vec<BookResponse>, BookError> {
        tracing::debug!(%keyword, "searching books by author");

        let books = self.store.search_by_author(keyword).await?;
        tracing::debug!(count = books.len(), %keyword, "author search finished");
        Ok(books.into_iter().map(Into::into).collect())
    }
}
