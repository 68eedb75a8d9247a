//! In-memory [`BookStore`] for unit tests.

use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::macros::date;

use super::models::{Book, NewBook};
use super::repository::{utc_now, BookStore, StoreError};

#[derive(Default)]
struct State {
    books: Vec<Book>,
    next_id: i64,
    calls: Vec<&'static str>,
    failing: bool,
    blind_existence_checks: bool,
}

/// Mirrors the SQLite store: ids ascend, ISBNs are unique and searches are
/// case-insensitive substring matches.
#[derive(Default)]
pub struct InMemoryBookStore {
    state: Mutex<State>,
}

impl InMemoryBookStore {
    pub fn seed(&self, book: Book) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(book.id);
        state.books.push(book);
    }

    /// Every following call fails with a database error
    pub fn fail_queries(&self) {
        self.state.lock().unwrap().failing = true;
    }

    /// Existence checks report `false`, as if a concurrent writer had not
    /// committed yet; inserts and updates still enforce uniqueness
    pub fn hide_isbns_from_existence_checks(&self) {
        self.state.lock().unwrap().blind_existence_checks = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().books.len()
    }

    fn enter(&self, call: &'static str) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(state)
    }
}

fn contains_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        let state = self.enter("exists_by_isbn")?;
        Ok(!state.blind_existence_checks && state.books.iter().any(|b| b.isbn == isbn))
    }

    async fn exists_by_isbn_excluding_id(&self, isbn: &str, id: i64) -> Result<bool, StoreError> {
        let state = self.enter("exists_by_isbn_excluding_id")?;
        Ok(!state.blind_existence_checks
            && state.books.iter().any(|b| b.isbn == isbn && b.id != id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let state = self.enter("find_by_id")?;
        Ok(state.books.iter().find(|b| b.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let state = self.enter("find_all")?;
        Ok(state.books.clone())
    }

    async fn search_by_title(&self, keyword: &str) -> Result<Vec<Book>, StoreError> {
        let state = self.enter("search_by_title")?;
        Ok(state
            .books
            .iter()
            .filter(|b| contains_ignoring_case(&b.title, keyword))
            .cloned()
            .collect())
    }

    async fn search_by_author(&self, keyword: &str) -> Result<Vec<Book>, StoreError> {
        let state = self.enter("search_by_author")?;
        Ok(state
            .books
            .iter()
            .filter(|b| contains_ignoring_case(&b.author, keyword))
            .cloned()
            .collect())
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut state = self.enter("insert")?;
        if state.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(StoreError::DuplicateIsbn { isbn: book.isbn });
        }

        state.next_id += 1;
        let now = utc_now();
        let stored = Book {
            id: state.next_id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_date: book.publication_date,
            price: book.price,
            description: book.description,
            pages: book.pages,
            publisher: book.publisher,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        state.books.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: Book) -> Result<Book, StoreError> {
        let mut state = self.enter("update")?;
        if state
            .books
            .iter()
            .any(|b| b.isbn == book.isbn && b.id != book.id)
        {
            return Err(StoreError::DuplicateIsbn { isbn: book.isbn });
        }

        let slot = state
            .books
            .iter_mut()
            .find(|b| b.id == book.id)
            .ok_or(StoreError::Missing { id: book.id })?;
        *slot = Book {
            created_at: slot.created_at,
            updated_at: utc_now(),
            version: slot.version + 1,
            ..book
        };
        Ok(slot.clone())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.enter("delete_by_id")?;
        state.books.retain(|b| b.id != id);
        Ok(())
    }
}

pub fn sample_book(id: i64, isbn: &str) -> Book {
    let now = utc_now();
    Book {
        id,
        title: format!("Book {id}"),
        author: "Robert C. Martin".to_string(),
        isbn: isbn.to_string(),
        publication_date: date!(2008 - 08 - 01),
        price: Decimal::from_str("45.99").unwrap(),
        description: None,
        pages: Some(464),
        publisher: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}
