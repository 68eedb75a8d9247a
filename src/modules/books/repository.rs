use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use super::models::{Book, NewBook};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected by the unique index on `isbn`
    #[error("a book with ISBN '{isbn}' already exists")]
    DuplicateIsbn { isbn: String },

    /// The row addressed by an update no longer exists
    #[error("book {id} no longer exists")]
    Missing { id: i64 },

    #[error("stored book {id} is unreadable: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations the book service relies on
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError>;

    async fn exists_by_isbn_excluding_id(&self, isbn: &str, id: i64) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    /// Case-insensitive substring match on the title; `""` matches everything
    async fn search_by_title(&self, keyword: &str) -> Result<Vec<Book>, StoreError>;

    /// Case-insensitive substring match on the author; `""` matches everything
    async fn search_by_author(&self, keyword: &str) -> Result<Vec<Book>, StoreError>;

    /// Assigns id, both timestamps and `version = 0`
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Refreshes `updated_at` and increments `version`
    async fn update(&self, book: Book) -> Result<Book, StoreError>;

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError>;
}

/// Current UTC wall clock without offset, as stored in the timestamp columns
pub fn utc_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    author: String,
    isbn: String,
    publication_date: Date,
    price: String,
    description: Option<String>,
    pages: Option<i32>,
    publisher: Option<String>,
    created_at: PrimitiveDateTime,
    updated_at: PrimitiveDateTime,
    version: i64,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(&row.price).map_err(|e| StoreError::Corrupt {
            id: row.id,
            reason: format!("price '{}': {}", row.price, e),
        })?;

        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            publication_date: row.publication_date,
            price,
            description: row.description,
            pages: row.pages,
            publisher: row.publisher,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

fn decode_all(rows: Vec<BookRow>) -> Result<Vec<Book>, StoreError> {
    rows.into_iter().map(Book::try_from).collect()
}

/// Keep books whose `field` contains `keyword`, ignoring case.
///
/// Folding happens here rather than in SQL: SQLite's `lower()` only knows ASCII.
fn matching(books: Vec<Book>, keyword: &str, field: fn(&Book) -> &str) -> Vec<Book> {
    let needle = keyword.to_lowercase();
    books
        .into_iter()
        .filter(|book| field(book).to_lowercase().contains(&needle))
        .collect()
}

/// Unique-index violations become [`StoreError::DuplicateIsbn`]
fn classify(error: sqlx::Error, isbn: &str) -> StoreError {
    let unique = error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StoreError::DuplicateIsbn {
            isbn: isbn.to_string(),
        }
    } else {
        StoreError::Database(error)
    }
}

/// [`BookStore`] over the SQLite `books` table
#[derive(Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        let found: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(found != 0)
    }

    async fn exists_by_isbn_excluding_id(&self, isbn: &str, id: i64) -> Result<bool, StoreError> {
        let found: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ? AND id <> ?)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found != 0)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let row: Option<BookRow> = sqlx::query_as("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Book::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let rows: Vec<BookRow> = sqlx::query_as("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn search_by_title(&self, keyword: &str) -> Result<Vec<Book>, StoreError> {
        Ok(matching(self.find_all().await?, keyword, |b| b.title.as_str()))
    }

    async fn search_by_author(&self, keyword: &str) -> Result<Vec<Book>, StoreError> {
        Ok(matching(self.find_all().await?, keyword, |b| b.author.as_str()))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let now = utc_now();
        let row: BookRow = sqlx::query_as(
            r#"
            INSERT INTO books (
                title, author, isbn, publication_date, price,
                description, pages, publisher, created_at, updated_at, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(book.price.to_string())
        .bind(&book.description)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, &book.isbn))?;

        Book::try_from(row)
    }

    async fn update(&self, book: Book) -> Result<Book, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(
            r#"
            UPDATE books SET
                title = ?, author = ?, isbn = ?, publication_date = ?, price = ?,
                description = ?, pages = ?, publisher = ?,
                updated_at = ?, version = version + 1
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(book.price.to_string())
        .bind(&book.description)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(utc_now())
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, &book.isbn))?;

        match row {
            Some(row) => Book::try_from(row),
            None => Err(StoreError::Missing { id: book.id }),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
