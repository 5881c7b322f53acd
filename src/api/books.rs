//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookPatch, BookQuery, NewBook},
        import_report::ImportReport,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List books with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = Vec<Book>),
        (status = 400, description = "Invalid paging parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    query.validate()?;

    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Book>> {
    state
        .services
        .catalog
        .get_book(id)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<NewBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    book.validate()?;

    let created = state.services.catalog.create_book(&book).await?;
    tracing::info!("Book {} created by {}", created.id, claims.sub);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partially update a book; `authors` replaces the whole author set
#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookPatch,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(fields): Json<serde_json::Value>,
) -> AppResult<Json<Book>> {
    state
        .services
        .catalog
        .update_book(id, fields)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.services.catalog.delete_book(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(book_not_found(id))
    }
}

/// Import a batch of books; any invalid record rejects the whole batch
#[utoipa::path(
    post,
    path = "/books/import",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = Vec<NewBook>,
    responses(
        (status = 201, description = "All books created", body = Vec<Book>),
        (status = 400, description = "Empty batch or invalid record", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(records): Json<Vec<serde_json::Value>>,
) -> AppResult<(StatusCode, Json<Vec<Book>>)> {
    let created = state.services.catalog.bulk_import(records).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Import a batch of books, keeping the valid ones and reporting the rest
#[utoipa::path(
    post,
    path = "/books/import/best-effort",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = Vec<NewBook>,
    responses(
        (status = 200, description = "Created books and rejected records", body = ImportReport),
        (status = 400, description = "Empty or oversized batch", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_books_best_effort(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(records): Json<Vec<serde_json::Value>>,
) -> AppResult<Json<ImportReport>> {
    let report = state.services.catalog.import_best_effort(records).await?;
    Ok(Json(report))
}

fn book_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}
