use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};
use utoipa::ToSchema;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(
    iso_timestamp,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

/// Book as persisted in the `books` table.
///
/// `id`, `created_at`, `updated_at` and `version` are owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Date,
    pub price: Decimal,
    pub description: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
    pub version: i64,
}

/// Validated input for a book that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Date,
    pub price: Decimal,
    pub description: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
}

/// Payload for create and update requests.
///
/// Every field is optional at the wire level so that missing values are
/// reported as validation violations instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    /// Book title
    #[schema(example = "Clean Code")]
    pub title: Option<String>,
    /// Book author
    #[schema(example = "Robert C. Martin")]
    pub author: Option<String>,
    /// International Standard Book Number (ISBN-13)
    #[schema(example = "978-0132350884")]
    pub isbn: Option<String>,
    /// Publication date, `YYYY-MM-DD`
    #[serde(default, with = "iso_date::option")]
    #[schema(value_type = Option<String>, format = Date, example = "2008-08-01")]
    pub publication_date: Option<Date>,
    /// Price, at most two fraction digits
    #[schema(value_type = Option<f64>, example = 45.99)]
    pub price: Option<Decimal>,
    #[schema(example = "A handbook of agile software craftsmanship")]
    pub description: Option<String>,
    #[schema(example = 464)]
    pub pages: Option<i32>,
    #[schema(example = "Prentice Hall")]
    pub publisher: Option<String>,
}

/// Book as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    #[schema(example = 1)]
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "2008-08-01")]
    pub publication_date: Date,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 45.99)]
    pub price: Decimal,
    pub description: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
    #[serde(with = "iso_timestamp")]
    #[schema(value_type = String, example = "2024-01-15T10:30:00")]
    pub created_at: PrimitiveDateTime,
    #[serde(with = "iso_timestamp")]
    #[schema(value_type = String, example = "2024-01-15T10:30:00")]
    pub updated_at: PrimitiveDateTime,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_date: book.publication_date,
            price: book.price,
            description: book.description,
            pages: book.pages,
            publisher: book.publisher,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Overlay every field present in `patch` onto `existing`.
///
/// Absent fields keep their stored value; `id`, timestamps and `version`
/// are never touched.
pub fn merge(mut existing: Book, patch: &BookRequest) -> Book {
    if let Some(title) = &patch.title {
        existing.title = title.clone();
    }
    if let Some(author) = &patch.author {
        existing.author = author.clone();
    }
    if let Some(isbn) = &patch.isbn {
        existing.isbn = isbn.clone();
    }
    if let Some(publication_date) = patch.publication_date {
        existing.publication_date = publication_date;
    }
    if let Some(price) = patch.price {
        existing.price = price;
    }
    if let Some(description) = &patch.description {
        existing.description = Some(description.clone());
    }
    if let Some(pages) = patch.pages {
        existing.pages = Some(pages);
    }
    if let Some(publisher) = &patch.publisher {
        existing.publisher = Some(publisher.clone());
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use time::macros::{date, datetime};

    fn stored() -> Book {
        Book {
            id: 7,
            title: "Clean Code".to_string(),
            author: "Robert C. Martin".to_string(),
            isbn: "978-0132350884".to_string(),
            publication_date: date!(2008 - 08 - 01),
            price: Decimal::from_str("45.99").unwrap(),
            description: Some("A handbook of agile software craftsmanship".to_string()),
            pages: Some(464),
            publisher: None,
            created_at: datetime!(2024-01-15 10:30:00),
            updated_at: datetime!(2024-01-15 10:30:00),
            version: 3,
        }
    }

    #[test]
    fn merge_with_only_price_keeps_everything_else() {
        let patch = BookRequest {
            price: Some(Decimal::from_str("39.50").unwrap()),
            ..BookRequest::default()
        };

        let merged = merge(stored(), &patch);

        assert_eq!(merged.price, Decimal::from_str("39.50").unwrap());
        assert_eq!(
            merged,
            Book {
                price: Decimal::from_str("39.50").unwrap(),
                ..stored()
            }
        );
    }

    #[test]
    fn merge_overwrites_present_fields() {
        let patch = BookRequest {
            title: Some("Clean Architecture".to_string()),
            isbn: Some("978-0134494166".to_string()),
            publisher: Some("Prentice Hall".to_string()),
            ..BookRequest::default()
        };

        let merged = merge(stored(), &patch);

        assert_eq!(merged.title, "Clean Architecture");
        assert_eq!(merged.isbn, "978-0134494166");
        assert_eq!(merged.publisher.as_deref(), Some("Prentice Hall"));
        assert_eq!(merged.author, "Robert C. Martin");
        assert_eq!(merged.description, stored().description);
        assert_eq!(merged.version, 3);
    }

    #[test]
    fn request_accepts_numeric_price_and_iso_date() {
        let request: BookRequest = serde_json::from_value(serde_json::json!({
            "title": "Clean Code",
            "isbn": "978-0132350884",
            "publicationDate": "2008-08-01",
            "price": 45.99
        }))
        .unwrap();

        assert_eq!(request.publication_date, Some(date!(2008 - 08 - 01)));
        assert_eq!(request.price, Some(Decimal::from_str("45.99").unwrap()));
        assert_eq!(request.author, None);
        assert_eq!(request.pages, None);
    }

    #[test]
    fn response_uses_camel_case_and_numeric_price() {
        let value = serde_json::to_value(BookResponse::from(stored())).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["publicationDate"], "2008-08-01");
        assert_eq!(value["price"], 45.99);
        assert_eq!(value["createdAt"], "2024-01-15T10:30:00");
        assert_eq!(value["updatedAt"], "2024-01-15T10:30:00");
        assert!(value["publisher"].is_null());
        assert!(value.get("version").is_none());
    }
}
