use shelf_http::AppError;

use super::service::BookError;

impl From<BookError> for AppError {
    fn from(error: BookError) -> Self {
        let message = error.to_string();
        match error {
            BookError::ValidationFailed(violations) => {
                let details = violations
                    .iter()
                    .filter_map(|v| serde_json::to_value(v).ok())
                    .collect();
                AppError::validation(details, message)
            }
            BookError::DuplicateIsbn(_) => AppError::bad_request_with_code("duplicate_isbn", message),
            BookError::NotFound(_) => AppError::not_found(message),
            BookError::Storage(cause) => {
                AppError::Internal(anyhow::Error::new(cause).context("book storage failure"))
            }
        }
    }
}
