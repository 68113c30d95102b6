//! Borrow/return ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::LendingViolation;

/// Lifecycle of a single loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    Borrowed,
    ReturnRequested,
    ReturnApproved,
}

impl LoanState {
    pub fn from_flags(returned: bool, return_approved: bool) -> Self {
        match (returned, return_approved) {
            (_, true) => LoanState::ReturnApproved,
            (true, false) => LoanState::ReturnRequested,
            (false, false) => LoanState::Borrowed,
        }
    }
}

/// Ledger entry linking a borrower and a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: i32,
    /// Identity of the borrower
    pub user_id: String,
    pub book_id: i32,
    pub returned: bool,
    pub return_approved: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    pub fn state(&self) -> LoanState {
        LoanState::from_flags(self.returned, self.return_approved)
    }

    /// An open loan still blocks a new borrow of the same book by the same user
    pub fn is_open(&self) -> bool {
        !self.return_approved
    }

    /// BORROWED -> RETURN_REQUESTED
    pub fn request_return(&mut self) -> Result<(), LendingViolation> {
        if self.state() != LoanState::Borrowed {
            return Err(LendingViolation::NotBorrowedByYou);
        }
        self.returned = true;
        Ok(())
    }

    /// RETURN_REQUESTED -> RETURN_APPROVED
    pub fn approve_return(&mut self) -> Result<(), LendingViolation> {
        if self.state() != LoanState::ReturnRequested {
            return Err(LendingViolation::NotYetReturned);
        }
        self.return_approved = true;
        Ok(())
    }
}

/// Ledger entry joined with its book, used by the listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BorrowedBook {
    pub id: i32,
    pub book_id: i32,
    pub user_id: String,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub returned: bool,
    pub return_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Borrowed book as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowedBookResponse {
    /// Transaction record ID
    pub id: i32,
    pub book_id: i32,
    pub borrower: String,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub returned: bool,
    pub return_approved: bool,
    pub state: LoanState,
    pub borrowed_at: DateTime<Utc>,
}

impl From<BorrowedBook> for BorrowedBookResponse {
    fn from(row: BorrowedBook) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            borrower: row.user_id,
            title: row.title,
            author_name: row.author_name,
            isbn: row.isbn,
            returned: row.returned,
            return_approved: row.return_approved,
            state: LoanState::from_flags(row.returned, row.return_approved),
            borrowed_at: row.created_at,
        }
    }
}
