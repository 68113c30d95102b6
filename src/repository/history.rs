//! Book transaction history (borrow/return ledger)

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult, LendingViolation},
    models::{Audit, BorrowedBook, Page, PageRequest, TransactionRecord},
};

use super::violates_constraint;

/// Partial unique index allowing a single open loan per (book, borrower)
const OPEN_LOAN_CONSTRAINT: &str = "book_transaction_history_open_loan_key";

const BORROWED_BOOK_COLUMNS: &str = r#"
    h.id, h.book_id, h.user_id, b.title, b.author_name, b.isbn,
    h.returned, h.return_approved, h.created_at
"#;

#[derive(Clone)]
pub struct HistoryRepository {
    pool: Pool<Postgres>,
}

impl HistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Every loan taken by the borrower
    pub async fn list_by_borrower(
        &self,
        borrower: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_transaction_history WHERE user_id = $1")
                .bind(borrower)
                .fetch_one(&self.pool)
                .await?;

        let query = format!(
            r#"
            SELECT {}
            FROM book_transaction_history h
            JOIN books b ON b.id = h.book_id
            WHERE h.user_id = $1
            ORDER BY h.created_at DESC, h.id DESC
            LIMIT $2 OFFSET $3
            "#,
            BORROWED_BOOK_COLUMNS
        );

        let content = sqlx::query_as::<_, BorrowedBook>(&query)
            .bind(borrower)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { content, total })
    }

    /// Loans on the owner's books that are waiting for return approval
    pub async fn list_returned_to_owner(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM book_transaction_history h
            JOIN books b ON b.id = h.book_id
            WHERE b.owner_id = $1 AND h.returned AND NOT h.return_approved
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            r#"
            SELECT {}
            FROM book_transaction_history h
            JOIN books b ON b.id = h.book_id
            WHERE b.owner_id = $1 AND h.returned AND NOT h.return_approved
            ORDER BY h.created_at DESC, h.id DESC
            LIMIT $2 OFFSET $3
            "#,
            BORROWED_BOOK_COLUMNS
        );

        let content = sqlx::query_as::<_, BorrowedBook>(&query)
            .bind(owner)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { content, total })
    }

    /// Whether the borrower still has a loan on the book that is not approved-returned
    pub async fn has_open_loan(
        conn: &mut PgConnection,
        book_id: i32,
        borrower: &str,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_transaction_history
                WHERE book_id = $1 AND user_id = $2 AND NOT return_approved
            )
            "#,
        )
        .bind(book_id)
        .bind(borrower)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// The borrower's loan on the book that has not been returned yet
    pub async fn find_borrowed(
        conn: &mut PgConnection,
        book_id: i32,
        borrower: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM book_transaction_history
            WHERE book_id = $1 AND user_id = $2 AND NOT returned AND NOT return_approved
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .bind(borrower)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(record)
    }

    /// Oldest returned, not yet approved loan on a book owned by `owner`
    pub async fn find_return_requested(
        conn: &mut PgConnection,
        book_id: i32,
        owner: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT h.* FROM book_transaction_history h
            JOIN books b ON b.id = h.book_id
            WHERE h.book_id = $1 AND b.owner_id = $2 AND h.returned AND NOT h.return_approved
            ORDER BY h.created_at, h.id
            LIMIT 1
            FOR UPDATE OF h
            "#,
        )
        .bind(book_id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(record)
    }

    /// Record a new loan in the BORROWED state
    pub async fn insert(
        conn: &mut PgConnection,
        book_id: i32,
        borrower: &str,
        audit: &Audit,
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO book_transaction_history
                (user_id, book_id, returned, return_approved, created_by, created_at)
            VALUES ($1, $2, FALSE, FALSE, $3, $4)
            RETURNING id
            "#,
        )
        .bind(borrower)
        .bind(book_id)
        .bind(&audit.actor)
        .bind(audit.at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if violates_constraint(&e, OPEN_LOAN_CONSTRAINT) {
                AppError::from(LendingViolation::AlreadyBorrowed)
            } else {
                AppError::from(e)
            }
        })?;

        Ok(id)
    }

    /// Persist the returned / approved flags of a loan
    pub async fn update(
        conn: &mut PgConnection,
        record: &TransactionRecord,
        audit: &Audit,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE book_transaction_history
            SET returned = $1, return_approved = $2, last_modified_by = $3, last_modified_at = $4
            WHERE id = $5
            "#,
        )
        .bind(record.returned)
        .bind(record.return_approved)
        .bind(&audit.actor)
        .bind(audit.at)
        .bind(record.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No transaction found with the ID: {}",
                record.id
            )));
        }
        Ok(())
    }
}
