//! Fast-fail ISBN uniqueness checks.
//!
//! The unique index on `books.isbn` stays the authoritative guard; two
//! concurrent requests can both pass these checks, and the loser is then
//! rejected by the store with the same error kind.

use super::repository::BookStore;
use super::service::BookError;

pub struct IsbnGuard<'a> {
    store: &'a dyn BookStore,
}

impl<'a> IsbnGuard<'a> {
    pub fn new(store: &'a dyn BookStore) -> Self {
        Self { store }
    }

    /// Fails when any stored book already carries `isbn`
    pub async fn ensure_creatable(&self, isbn: &str) -> Result<(), BookError> {
        if self.store.exists_by_isbn(isbn).await? {
            tracing::warn!(%isbn, "attempt to create book with duplicate ISBN");
            return Err(BookError::DuplicateIsbn(isbn.to_string()));
        }
        Ok(())
    }

    /// Fails when a book other than `exclude_id` carries `isbn`
    pub async fn ensure_updatable(&self, isbn: &str, exclude_id: i64) -> Result<(), BookError> {
        if self.store.exists_by_isbn_excluding_id(isbn, exclude_id).await? {
            tracing::warn!(%isbn, book_id = exclude_id, "attempt to update book with duplicate ISBN");
            return Err(BookError::DuplicateIsbn(isbn.to_string()));
        }
        Ok(())
    }
}
