//! Error types for the Book Network server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error codes exposed to clients in the `code` field of error bodies.
///
/// The 300 range is kept stable for account errors so existing clients
/// can keep branching on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoCode = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    Duplicate = 6,
    PermissionDenied = 7,
    StorageFailure = 8,
    BookNotLendable = 10,
    SelfLending = 11,
    AlreadyBorrowed = 12,
    NotBorrowed = 13,
    NotYetReturned = 14,
    IncorrectCurrentPassword = 300,
    NewPasswordDoesNotMatch = 301,
    AccountLocked = 302,
    AccountDisabled = 303,
    BadCredentials = 304,
}

/// Reasons a lending operation is refused because of the book or loan state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingViolation {
    #[error("The requested book cannot be lent since it is archived or not shareable")]
    NotLendable,

    #[error("You cannot borrow your own book")]
    SelfBorrow,

    #[error("You cannot return your own book")]
    SelfReturn,

    #[error("The requested book is already borrowed")]
    AlreadyBorrowed,

    #[error("You did not borrow this book")]
    NotBorrowedByYou,

    #[error("The book is not returned yet. You cannot approve its return")]
    NotYetReturned,
}

impl LendingViolation {
    fn code(self) -> ErrorCode {
        match self {
            LendingViolation::NotLendable => ErrorCode::BookNotLendable,
            LendingViolation::SelfBorrow | LendingViolation::SelfReturn => ErrorCode::SelfLending,
            LendingViolation::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
            LendingViolation::NotBorrowedByYou => ErrorCode::NotBorrowed,
            LendingViolation::NotYetReturned => ErrorCode::NotYetReturned,
        }
    }
}

/// Account related failures (login, password change)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    #[error("Current password is incorrect")]
    IncorrectCurrentPassword,

    #[error("The new password does not match")]
    NewPasswordDoesNotMatch,

    #[error("User account is locked")]
    AccountLocked,

    #[error("User account is disabled")]
    AccountDisabled,

    #[error("Login and / or password is incorrect")]
    BadCredentials,
}

impl AccountError {
    fn status_and_code(self) -> (StatusCode, ErrorCode) {
        match self {
            AccountError::IncorrectCurrentPassword => {
                (StatusCode::BAD_REQUEST, ErrorCode::IncorrectCurrentPassword)
            }
            AccountError::NewPasswordDoesNotMatch => {
                (StatusCode::BAD_REQUEST, ErrorCode::NewPasswordDoesNotMatch)
            }
            AccountError::AccountLocked => (StatusCode::FORBIDDEN, ErrorCode::AccountLocked),
            AccountError::AccountDisabled => (StatusCode::FORBIDDEN, ErrorCode::AccountDisabled),
            AccountError::BadCredentials => (StatusCode::FORBIDDEN, ErrorCode::BadCredentials),
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(#[from] LendingViolation),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    /// HTTP status and client code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::PermissionDenied(_) => (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::InvalidState(violation) => (StatusCode::CONFLICT, violation.code()),
            AppError::Account(account) => account.status_and_code(),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StorageFailure),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Authentication(msg)
            | AppError::PermissionDenied(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg) => msg.clone(),
            AppError::InvalidState(violation) => violation.to_string(),
            AppError::Account(account) => account.to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "File storage error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
