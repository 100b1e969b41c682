//! Catalog endpoints: public search and book management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{Book, BookInput},
    services::{catalog::CatalogQuery, circulation::BookAvailability},
    AppState,
};

use super::AuthenticatedUser;

/// Public catalog search, with live availability
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "books",
    params(
        ("q" = Option<String>, Query, description = "Title, author or catalog number")
    ),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookAvailability>),
        (status = 403, description = "Store denied access", body = crate::error::ErrorResponse)
    )
)]
pub async fn public_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<BookAvailability>>> {
    let books = state.services.catalog.public_catalog(&query).await?;
    Ok(Json(books))
}

/// Admin book list with active loan counts
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("q" = Option<String>, Query, description = "Title, author or catalog number")
    ),
    responses(
        (status = 200, description = "Books", body = Vec<BookAvailability>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Query(query): Query<CatalogQuery>,
) -> Json<Vec<BookAvailability>> {
    Json(state.services.catalog.list(&query))
}

/// Get a book by catalog number
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Catalog number")
    ),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get(&id).await?;
    Ok(Json(book))
}

/// Create or replace a book keyed by its catalog number
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book saved", body = Book),
        (status = 400, description = "Missing fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn save_book(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Json(input): Json<BookInput>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.upsert(input).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Catalog number")
    ),
    responses(
        (status = 204, description = "Book deleted")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
