//! Borrow / return / approve rules
//!
//! Each operation runs in its own transaction: the book row is locked
//! first, every guard is evaluated against that locked state, and the
//! ledger write is committed only when all guards pass.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult, LendingViolation},
    models::{Audit, Book, BorrowedBookResponse, PageRequest, PageResponse},
    repository::{LendingStore, LendingTx},
};

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LendingStore>,
}

fn ensure_lendable(book: &Book) -> Result<(), LendingViolation> {
    if book.is_lendable() {
        Ok(())
    } else {
        Err(LendingViolation::NotLendable)
    }
}

async fn lock_book(tx: &mut Box<dyn LendingTx>, book_id: i32) -> AppResult<Book> {
    tx.lock_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No book found with the ID: {}", book_id)))
}

impl LendingService {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    /// Borrow a book, returning the new transaction record ID
    pub async fn borrow(&self, book_id: i32, borrower: &str) -> AppResult<i32> {
        let mut tx = self.store.begin().await?;
        let book = lock_book(&mut tx, book_id).await?;

        ensure_lendable(&book)?;
        if book.is_owned_by(borrower) {
            return Err(LendingViolation::SelfBorrow.into());
        }
        if tx.has_open_loan(book_id, borrower).await? {
            return Err(LendingViolation::AlreadyBorrowed.into());
        }

        let record_id = tx.insert_loan(book_id, borrower, &Audit::now(borrower)).await?;
        tx.commit().await?;

        tracing::info!(book_id, borrower, record_id, "Book borrowed");
        Ok(record_id)
    }

    /// Mark the borrower's loan as returned, waiting for the owner's approval
    pub async fn return_book(&self, book_id: i32, borrower: &str) -> AppResult<i32> {
        let mut tx = self.store.begin().await?;
        let book = lock_book(&mut tx, book_id).await?;

        ensure_lendable(&book)?;
        if book.is_owned_by(borrower) {
            return Err(LendingViolation::SelfReturn.into());
        }

        let mut record = tx
            .borrowed_loan(book_id, borrower)
            .await?
            .ok_or(LendingViolation::NotBorrowedByYou)?;
        record.request_return()?;
        tx.update_loan(&record, &Audit::now(borrower)).await?;
        tx.commit().await?;

        tracing::info!(book_id, borrower, record_id = record.id, "Book returned");
        Ok(record.id)
    }

    /// Owner confirms a returned book is back
    pub async fn approve_return(&self, book_id: i32, owner: &str) -> AppResult<i32> {
        let mut tx = self.store.begin().await?;
        let book = lock_book(&mut tx, book_id).await?;

        ensure_lendable(&book)?;
        if !book.is_owned_by(owner) {
            return Err(AppError::PermissionDenied(
                "You cannot approve the return of a book you do not own".to_string(),
            ));
        }

        let mut record = tx
            .return_requested_loan(book_id, owner)
            .await?
            .ok_or(LendingViolation::NotYetReturned)?;
        record.approve_return()?;
        tx.update_loan(&record, &Audit::now(owner)).await?;
        tx.commit().await?;

        tracing::info!(
            book_id,
            owner,
            borrower = %record.user_id,
            record_id = record.id,
            "Book return approved"
        );
        Ok(record.id)
    }

    /// Every loan taken by the user
    pub async fn borrowed_by(
        &self,
        borrower: &str,
        page: PageRequest,
    ) -> AppResult<PageResponse<BorrowedBookResponse>> {
        let rows = self.store.loans_by_borrower(borrower, page).await?;
        Ok(PageResponse::new(rows.map(BorrowedBookResponse::from), page))
    }

    /// Returned loans on the user's books that still need approval
    pub async fn returned_to(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<PageResponse<BorrowedBookResponse>> {
        let rows = self.store.returns_to_owner(owner, page).await?;
        Ok(PageResponse::new(rows.map(BorrowedBookResponse::from), page))
    }
}
