//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        page::BookPage, BookResponse, CreateBook, PageQuery, PageRequest, PageResponse,
    },
    services::storage::extension_of,
    AppState,
};

use super::AuthenticatedUser;

/// Multipart body for cover uploads
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CoverUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Create a new book owned by the caller
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created, returns its ID", body = i32),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<i32>)> {
    let id = state
        .services
        .books
        .create_book(claims.principal(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookResponse>> {
    let book = state.services.books.get_book(id).await?;
    Ok(Json(book))
}

/// Books available for borrowing, excluding the caller's own
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Shareable books", body = BookPage)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BookResponse>>> {
    let page = state
        .services
        .books
        .list_displayable(claims.principal(), PageRequest::from(&query))
        .await?;
    Ok(Json(page))
}

/// Books owned by the caller
#[utoipa::path(
    get,
    path = "/books/owner",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's books", body = BookPage)
    )
)]
pub async fn list_my_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BookResponse>>> {
    let page = state
        .services
        .books
        .list_owned(claims.principal(), PageRequest::from(&query))
        .await?;
    Ok(Json(page))
}

/// Flip the shareable flag of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/shareable/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Flag toggled, returns the book ID", body = i32),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn toggle_shareable(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<i32>> {
    let id = state
        .services
        .books
        .toggle_shareable(id, claims.principal())
        .await?;
    Ok(Json(id))
}

/// Flip the archived flag of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/archived/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Flag toggled, returns the book ID", body = i32),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn toggle_archived(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<i32>> {
    let id = state
        .services
        .books
        .toggle_archived(id, claims.principal())
        .await?;
    Ok(Json(id))
}

/// Upload a cover image (multipart field `file`)
#[utoipa::path(
    post,
    path = "/books/cover/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = CoverUpload, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Cover stored"),
        (status = 400, description = "Missing or empty file"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn upload_cover(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let extension = field.file_name().and_then(extension_of);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        state
            .services
            .books
            .set_cover(id, claims.principal(), extension, data.to_vec())
            .await?;
        return Ok(StatusCode::ACCEPTED);
    }

    Err(AppError::BadRequest("Missing multipart field 'file'".to_string()))
}
