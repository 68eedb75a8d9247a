//! Field-level rules for book payloads.
//!
//! Rules run in declaration order and every failure is collected, so a
//! caller sees all problems with a request at once. Nothing here touches
//! storage or the clock; "today" is supplied by the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use time::Date;
use utoipa::ToSchema;

use super::models::{BookRequest, NewBook};

pub const TITLE_MAX: usize = 255;
pub const AUTHOR_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 1000;
pub const PUBLISHER_MAX: usize = 100;
const ISBN_DIGITS: usize = 13;
const PRICE_INTEGER_DIGITS: usize = 10;
const PRICE_FRACTION_DIGITS: u32 = 2;

static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^97[89](?:-[0-9]+){1,4}$").expect("ISBN pattern compiles"));

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[schema(example = "isbn")]
    pub field: String,
    #[schema(value_type = Object, example = "invalid-isbn")]
    pub rejected_value: Value,
    #[schema(example = "ISBN is required")]
    pub message: String,
}

struct Rule {
    field: &'static str,
    message: &'static str,
    rejected: fn(&BookRequest) -> Value,
    holds: fn(&BookRequest, Date) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        field: "title",
        message: "Title is required",
        rejected: |r| text(&r.title),
        holds: |r, _| !is_blank(&r.title),
    },
    Rule {
        field: "title",
        message: "Title must be between 1 and 255 characters",
        rejected: |r| text(&r.title),
        holds: |r, _| length_within(&r.title, 1, TITLE_MAX),
    },
    Rule {
        field: "author",
        message: "Author is required",
        rejected: |r| text(&r.author),
        holds: |r, _| !is_blank(&r.author),
    },
    Rule {
        field: "author",
        message: "Author must be between 1 and 255 characters",
        rejected: |r| text(&r.author),
        holds: |r, _| length_within(&r.author, 1, AUTHOR_MAX),
    },
    Rule {
        field: "isbn",
        message: "ISBN is required",
        rejected: |r| text(&r.isbn),
        holds: |r, _| !is_blank(&r.isbn),
    },
    Rule {
        field: "isbn",
        message: "ISBN must be in format: 978-X-XXXX-XXXX-X or 979-X-XXXX-XXXX-X (e.g., 978-0-13235-088-4)",
        rejected: |r| text(&r.isbn),
        holds: |r, _| r.isbn.as_deref().map_or(true, is_isbn13),
    },
    Rule {
        field: "publicationDate",
        message: "Publication date is required",
        rejected: |r| date(r.publication_date),
        holds: |r, _| r.publication_date.is_some(),
    },
    Rule {
        field: "publicationDate",
        message: "Publication date cannot be in the future",
        rejected: |r| date(r.publication_date),
        holds: |r, today| r.publication_date.map_or(true, |d| d <= today),
    },
    Rule {
        field: "price",
        message: "Price is required",
        rejected: |r| price(r.price),
        holds: |r, _| r.price.is_some(),
    },
    Rule {
        field: "price",
        message: "Price must be greater than 0",
        rejected: |r| price(r.price),
        holds: |r, _| r.price.map_or(true, |p| p >= Decimal::new(1, 2)),
    },
    Rule {
        field: "price",
        message: "Invalid price format",
        rejected: |r| price(r.price),
        holds: |r, _| r.price.map_or(true, price_digits_fit),
    },
    Rule {
        field: "description",
        message: "Description must not exceed 1000 characters",
        rejected: |r| text(&r.description),
        holds: |r, _| length_within(&r.description, 0, DESCRIPTION_MAX),
    },
    Rule {
        field: "pages",
        message: "Number of pages must be at least 1",
        rejected: |r| r.pages.map_or(Value::Null, Value::from),
        holds: |r, _| r.pages.map_or(true, |p| p >= 1),
    },
    Rule {
        field: "publisher",
        message: "Publisher name must not exceed 100 characters",
        rejected: |r| text(&r.publisher),
        holds: |r, _| length_within(&r.publisher, 0, PUBLISHER_MAX),
    },
];

/// Check `request` against every rule.
///
/// Returns the storable book when nothing was violated, otherwise every
/// violation in rule order.
pub fn validate(request: &BookRequest, today: Date) -> Result<NewBook, Vec<Violation>> {
    let violations: Vec<Violation> = RULES
        .iter()
        .filter(|rule| !(rule.holds)(request, today))
        .map(|rule| Violation {
            field: rule.field.to_string(),
            rejected_value: (rule.rejected)(request),
            message: rule.message.to_string(),
        })
        .collect();

    // A missing required field always trips its presence rule, so the
    // fallback arm never carries an empty list.
    match (
        &request.title,
        &request.author,
        &request.isbn,
        request.publication_date,
        request.price,
    ) {
        (Some(title), Some(author), Some(isbn), Some(publication_date), Some(price))
            if violations.is_empty() =>
        {
            Ok(NewBook {
                title: title.clone(),
                author: author.clone(),
                isbn: isbn.clone(),
                publication_date,
                price,
                description: request.description.clone(),
                pages: request.pages,
                publisher: request.publisher.clone(),
            })
        }
        _ => Err(violations),
    }
}

/// `978-`/`979-` prefix, hyphen-separated digit groups, 13 digits in total.
pub fn is_isbn13(candidate: &str) -> bool {
    ISBN_PATTERN.is_match(candidate)
        && candidate.chars().filter(char::is_ascii_digit).count() == ISBN_DIGITS
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn length_within(value: &Option<String>, min: usize, max: usize) -> bool {
    value
        .as_deref()
        .map_or(true, |v| (min..=max).contains(&v.chars().count()))
}

/// Trailing zeros do not count toward the fraction digits.
fn price_digits_fit(price: Decimal) -> bool {
    let normalized = price.normalize();
    let integer_digits = normalized
        .trunc()
        .abs()
        .to_string()
        .trim_start_matches('0')
        .len();
    normalized.scale() <= PRICE_FRACTION_DIGITS && integer_digits <= PRICE_INTEGER_DIGITS
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

fn date(value: Option<Date>) -> Value {
    value.map_or(Value::Null, |d| Value::String(d.to_string()))
}

/// Echoed as a JSON number, like the `price` field of a response
fn price(value: Option<Decimal>) -> Value {
    value
        .and_then(|p| p.to_f64())
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 10 - 18);

    fn valid_request() -> BookRequest {
        BookRequest {
            title: Some("Clean Code".to_string()),
            author: Some("Robert C. Martin".to_string()),
            isbn: Some("978-0132350884".to_string()),
            publication_date: Some(date!(2008 - 08 - 01)),
            price: Some(Decimal::from_str("45.99").unwrap()),
            description: None,
            pages: None,
            publisher: None,
        }
    }

    fn fields(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn valid_request_yields_new_book() {
        let book = validate(&valid_request(), TODAY).unwrap();
        assert_eq!(book.title, "Clean Code");
        assert_eq!(book.isbn, "978-0132350884");
        assert_eq!(book.price, Decimal::from_str("45.99").unwrap());
    }

    #[test]
    fn empty_request_reports_every_required_field() {
        let violations = validate(&BookRequest::default(), TODAY).unwrap_err();
        assert_eq!(
            fields(&violations),
            vec!["title", "author", "isbn", "publicationDate", "price"]
        );
        assert!(violations.iter().all(|v| v.rejected_value.is_null()));
    }

    #[test]
    fn invalid_isbn_names_isbn_field() {
        let request = BookRequest {
            isbn: Some("invalid-isbn".to_string()),
            ..valid_request()
        };

        let violations = validate(&request, TODAY).unwrap_err();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "isbn");
        assert_eq!(violations[0].rejected_value, Value::from("invalid-isbn"));
        assert!(violations[0].message.starts_with("ISBN must be in format"));
    }

    #[test]
    fn empty_title_and_bad_isbn_are_reported_together() {
        let request = BookRequest {
            title: Some(String::new()),
            isbn: Some("invalid-isbn".to_string()),
            ..valid_request()
        };

        let violations = validate(&request, TODAY).unwrap_err();

        assert_eq!(fields(&violations), vec!["title", "title", "isbn"]);
        assert_eq!(violations[0].message, "Title is required");
        assert_eq!(
            violations[1].message,
            "Title must be between 1 and 255 characters"
        );
    }

    #[test]
    fn whitespace_title_is_blank_but_within_length() {
        let request = BookRequest {
            title: Some("   ".to_string()),
            ..valid_request()
        };

        let violations = validate(&request, TODAY).unwrap_err();

        assert_eq!(fields(&violations), vec!["title"]);
        assert_eq!(violations[0].message, "Title is required");
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let request = BookRequest {
            title: Some("é".repeat(TITLE_MAX)),
            publisher: Some("ü".repeat(PUBLISHER_MAX)),
            ..valid_request()
        };
        assert!(validate(&request, TODAY).is_ok());

        let request = BookRequest {
            title: Some("x".repeat(TITLE_MAX + 1)),
            description: Some("x".repeat(DESCRIPTION_MAX + 1)),
            publisher: Some("x".repeat(PUBLISHER_MAX + 1)),
            ..valid_request()
        };
        let violations = validate(&request, TODAY).unwrap_err();
        assert_eq!(fields(&violations), vec!["title", "description", "publisher"]);
    }

    #[test]
    fn publication_date_today_is_allowed_tomorrow_is_not() {
        let request = BookRequest {
            publication_date: Some(TODAY),
            ..valid_request()
        };
        assert!(validate(&request, TODAY).is_ok());

        let request = BookRequest {
            publication_date: Some(date!(2026 - 10 - 19)),
            ..valid_request()
        };
        let violations = validate(&request, TODAY).unwrap_err();
        assert_eq!(violations[0].field, "publicationDate");
        assert_eq!(
            violations[0].message,
            "Publication date cannot be in the future"
        );
        assert_eq!(violations[0].rejected_value, Value::from("2026-10-19"));
    }

    #[rstest]
    #[case("0.01", true)]
    #[case("45.99", true)]
    #[case("45.990", true)]
    #[case("9999999999.99", true)]
    #[case("0", false)]
    #[case("0.00", false)]
    #[case("-5", false)]
    fn price_must_be_positive(#[case] raw: &str, #[case] accepted: bool) {
        let request = BookRequest {
            price: Some(Decimal::from_str(raw).unwrap()),
            ..valid_request()
        };
        assert_eq!(validate(&request, TODAY).is_ok(), accepted, "price {raw}");
    }

    #[rstest]
    #[case("45.999")]
    #[case("12345678901")]
    #[case("12345678901.5")]
    fn price_precision_is_bounded(#[case] raw: &str) {
        let request = BookRequest {
            price: Some(Decimal::from_str(raw).unwrap()),
            ..valid_request()
        };
        let violations = validate(&request, TODAY).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "Invalid price format");
    }

    #[test]
    fn rejected_price_is_echoed_as_a_number() {
        let request = BookRequest {
            price: Some(Decimal::from_str("45.999").unwrap()),
            ..valid_request()
        };

        let violations = validate(&request, TODAY).unwrap_err();

        assert_eq!(violations[0].field, "price");
        assert_eq!(violations[0].rejected_value, serde_json::json!(45.999));
        assert!(violations[0].rejected_value.is_number());
    }

    #[rstest]
    #[case::title("title")]
    #[case::author("author")]
    #[case::isbn("isbn")]
    #[case::publication_date("publicationDate")]
    #[case::price("price")]
    fn each_missing_required_field_is_reported(#[case] missing: &str) {
        let mut request = valid_request();
        match missing {
            "title" => request.title = None,
            "author" => request.author = None,
            "isbn" => request.isbn = None,
            "publicationDate" => request.publication_date = None,
            _ => request.price = None,
        }

        let violations = validate(&request, TODAY).unwrap_err();

        assert!(!violations.is_empty());
        assert_eq!(fields(&violations), vec![missing]);
        assert!(violations[0].rejected_value.is_null());
    }

    #[test]
    fn pages_must_be_at_least_one() {
        let request = BookRequest {
            pages: Some(0),
            ..valid_request()
        };
        let violations = validate(&request, TODAY).unwrap_err();
        assert_eq!(fields(&violations), vec!["pages"]);
        assert_eq!(violations[0].rejected_value, Value::from(0));

        let request = BookRequest {
            pages: Some(1),
            ..valid_request()
        };
        assert!(validate(&request, TODAY).is_ok());
    }

    #[rstest]
    #[case("978-0132350884", true)]
    #[case("978-0-13235-088-4", true)]
    #[case("979-10-90636-07-1", true)]
    #[case("invalid-isbn", false)]
    #[case("9780132350884", false)]
    #[case("977-0132350884", false)]
    #[case("978--0132350884", false)]
    #[case("978-013235088", false)]
    #[case("978-01323508845", false)]
    #[case("978-0-1-2-3-45678901", false)]
    #[case("978-0132350884-", false)]
    fn isbn13_shape(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(is_isbn13(candidate), expected, "{candidate}");
    }

    #[test]
    fn violations_serialize_camel_case() {
        let violation = Violation {
            field: "isbn".to_string(),
            rejected_value: Value::from("invalid-isbn"),
            message: "bad".to_string(),
        };
        let value = serde_json::to_value(&violation).unwrap();
        assert_eq!(value["rejectedValue"], "invalid-isbn");
    }
}
