//! HTTP endpoints for the books module, mounted under `/api/v1/books`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shelf_http::{error::ErrorEnvelope, AppError};
use utoipa::{IntoParams, OpenApi};

use super::models::{BookRequest, BookResponse};
use super::service::BookService;
use super::validation::Violation;

type Service = State<Arc<BookService>>;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_book,
        get_all_books,
        get_book,
        update_book,
        delete_book,
        search_by_title,
        search_by_author
    ),
    components(schemas(BookRequest, BookResponse, Violation)),
    tags((name = "Books", description = "Book management endpoints"))
)]
pub struct BooksApi;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    /// Substring to look for in titles, case-insensitive
    pub title: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorQuery {
    /// Substring to look for in author names, case-insensitive
    pub author: String,
}

pub fn router(service: Arc<BookService>) -> Router {
    Router::new()
        .route("/", get(get_all_books).post(create_book))
        .route("/search/title", get(search_by_title))
        .route("/search/author", get(search_by_author))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid input or duplicate ISBN", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
async fn create_book(
    State(service): Service,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(request) = payload?;
    tracing::info!(isbn = ?request.isbn, "received request to create book");
    let book = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// List every book
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    responses(
        (status = 200, description = "All books", body = Vec<BookResponse>),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
async fn get_all_books(State(service): Service) -> Result<Json<Vec<BookResponse>>, AppError> {
    tracing::info!("received request to list books");
    Ok(Json(service.get_all().await?))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book found", body = BookResponse),
        (status = 400, description = "Malformed id", body = ErrorEnvelope),
        (status = 404, description = "Book not found", body = ErrorEnvelope)
    )
)]
async fn get_book(
    State(service): Service,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Path(id) = id?;
    tracing::info!(book_id = id, "received request to get book");
    Ok(Json(service.get_by_id(id).await?))
}

/// Update a book; optional fields left out of the payload keep their value
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid input or duplicate ISBN", body = ErrorEnvelope),
        (status = 404, description = "Book not found", body = ErrorEnvelope)
    )
)]
async fn update_book(
    State(service): Service,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    tracing::info!(book_id = id, "received request to update book");
    Ok(Json(service.update(id, request).await?))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = ErrorEnvelope)
    )
)]
async fn delete_book(
    State(service): Service,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    tracing::info!(book_id = id, "received request to delete book");
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search books by title
#[utoipa::path(
    get,
    path = "/search/title",
    tag = "Books",
    params(TitleQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookResponse>),
        (status = 400, description = "Missing title parameter", body = ErrorEnvelope)
    )
)]
async fn search_by_title(
    State(service): Service,
    query: Result<Query<TitleQuery>, QueryRejection>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let Query(query) = query?;
    tracing::info!(keyword = %query.title, "received title search");
    Ok(Json(service.search_by_title(&query.title).await?))
}

/// Search books by author
#[utoipa::path(
    get,
    path = "/search/author",
    tag = "Books",
    params(AuthorQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookResponse>),
        (status = 400, description = "Missing author parameter", body = ErrorEnvelope)
    )
)]
async fn search_by_author(
    State(service): Service,
    query: Result<Query<AuthorQuery>, QueryRejection>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let Query(query) = query?;
    tracing::info!(keyword = %query.author, "received author search");
    Ok(Json(service.search_by_author(&query.author).await?))
}
