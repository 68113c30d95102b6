//! Borrow / return endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{page::BorrowedBookPage, BorrowedBookResponse, PageQuery, PageRequest, PageResponse},
    AppState,
};

use super::AuthenticatedUser;

/// Books borrowed by the caller
#[utoipa::path(
    get,
    path = "/books/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's loans", body = BorrowedBookPage)
    )
)]
pub async fn list_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BorrowedBookResponse>>> {
    let page = state
        .services
        .lending
        .borrowed_by(claims.principal(), PageRequest::from(&query))
        .await?;
    Ok(Json(page))
}

/// Returned loans on the caller's books waiting for approval
#[utoipa::path(
    get,
    path = "/books/returned",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Returns to approve", body = BorrowedBookPage)
    )
)]
pub async fn list_returned(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BorrowedBookResponse>>> {
    let page = state
        .services
        .lending
        .returned_to(claims.principal(), PageRequest::from(&query))
        .await?;
    Ok(Json(page))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/borrow/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book borrowed, returns the transaction ID", body = i32),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not lendable, own book or already borrowed")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    let id = state
        .services
        .lending
        .borrow(book_id, claims.principal())
        .await?;
    Ok(Json(id))
}

/// Return a borrowed book
#[utoipa::path(
    patch,
    path = "/books/borrow/return/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Return requested, returns the transaction ID", body = i32),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not lendable or not borrowed by the caller")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    let id = state
        .services
        .lending
        .return_book(book_id, claims.principal())
        .await?;
    Ok(Json(id))
}

/// Approve the return of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/borrow/return/approve/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Return approved, returns the transaction ID", body = i32),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not returned yet")
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    let id = state
        .services
        .lending
        .approve_return(book_id, claims.principal())
        .await?;
    Ok(Json(id))
}
