//! Repository layer for database operations
//!
//! Services talk to persistence through [`LendingStore`] for reads and
//! single inserts, and through a [`LendingTx`] for every check-then-write
//! sequence. A transaction that is dropped without [`LendingTx::commit`]
//! is rolled back.

pub mod books;
pub mod history;
pub mod users;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::AppResult,
    models::{
        user::{CreateUser, User},
        Audit, Book, BorrowedBook, CreateBook, Page, PageRequest, TransactionRecord,
    },
};

use books::BooksRepository;
use history::HistoryRepository;

/// Read queries and the entry point for lending transactions
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Start a transaction for a check-then-write operation
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>>;

    /// Check that the backing store answers
    async fn ping(&self) -> AppResult<()>;

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    async fn insert_book(&self, book: &CreateBook, audit: &Audit) -> AppResult<i32>;

    /// Shareable, non archived books not owned by `user`, newest first
    async fn displayable_books(&self, user: &str, page: PageRequest) -> AppResult<Page<Book>>;

    async fn books_by_owner(&self, owner: &str, page: PageRequest) -> AppResult<Page<Book>>;

    async fn loans_by_borrower(
        &self,
        borrower: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>>;

    /// Return-requested loans on books owned by `owner`
    async fn returns_to_owner(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>>;
}

/// Operations available inside a lending transaction
#[async_trait]
pub trait LendingTx: Send {
    /// Get a book and hold it until commit or rollback
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>>;

    async fn update_book(&mut self, book: &Book, audit: &Audit) -> AppResult<()>;

    /// Whether (book, borrower) has a loan that is not approved-returned
    async fn has_open_loan(&mut self, book_id: i32, borrower: &str) -> AppResult<bool>;

    /// The (book, borrower) loan in the BORROWED state
    async fn borrowed_loan(
        &mut self,
        book_id: i32,
        borrower: &str,
    ) -> AppResult<Option<TransactionRecord>>;

    /// The oldest RETURN_REQUESTED loan on a book owned by `owner`
    async fn return_requested_loan(
        &mut self,
        book_id: i32,
        owner: &str,
    ) -> AppResult<Option<TransactionRecord>>;

    async fn insert_loan(&mut self, book_id: i32, borrower: &str, audit: &Audit) -> AppResult<i32>;

    async fn update_loan(&mut self, record: &TransactionRecord, audit: &Audit) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get user by login (case insensitive)
    async fn get_by_login(&self, login: &str) -> AppResult<Option<User>>;

    async fn login_exists(&self, login: &str) -> AppResult<bool>;

    /// Create a new user with an already hashed password. A login taken
    /// concurrently is reported as [`AppError::Conflict`](crate::error::AppError::Conflict).
    async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User>;

    /// Replace the password hash of a user
    async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()>;
}

/// Whether `error` is a violation of the named database constraint
pub(crate) fn violates_constraint(error: &sqlx::Error, constraint: &str) -> bool {
    error.as_database_error().and_then(|db| db.constraint()) == Some(constraint)
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: BooksRepository,
    pub history: HistoryRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: BooksRepository::new(pool.clone()),
            history: HistoryRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LendingStore for Repository {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLendingTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        self.books.get_by_id(id).await
    }

    async fn insert_book(&self, book: &CreateBook, audit: &Audit) -> AppResult<i32> {
        self.books.create(book, audit).await
    }

    async fn displayable_books(&self, user: &str, page: PageRequest) -> AppResult<Page<Book>> {
        self.books.list_displayable(user, page).await
    }

    async fn books_by_owner(&self, owner: &str, page: PageRequest) -> AppResult<Page<Book>> {
        self.books.list_by_owner(owner, page).await
    }

    async fn loans_by_borrower(
        &self,
        borrower: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        self.history.list_by_borrower(borrower, page).await
    }

    async fn returns_to_owner(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        self.history.list_returned_to_owner(owner, page).await
    }
}

/// Postgres transaction backing [`LendingTx`]
pub struct PgLendingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LendingTx for PgLendingTx {
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        BooksRepository::lock_by_id(&mut self.tx, id).await
    }

    async fn update_book(&mut self, book: &Book, audit: &Audit) -> AppResult<()> {
        BooksRepository::update(&mut self.tx, book, audit).await
    }

    async fn has_open_loan(&mut self, book_id: i32, borrower: &str) -> AppResult<bool> {
        HistoryRepository::has_open_loan(&mut self.tx, book_id, borrower).await
    }

    async fn borrowed_loan(
        &mut self,
        book_id: i32,
        borrower: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        HistoryRepository::find_borrowed(&mut self.tx, book_id, borrower).await
    }

    async fn return_requested_loan(
        &mut self,
        book_id: i32,
        owner: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        HistoryRepository::find_return_requested(&mut self.tx, book_id, owner).await
    }

    async fn insert_loan(&mut self, book_id: i32, borrower: &str, audit: &Audit) -> AppResult<i32> {
        HistoryRepository::insert(&mut self.tx, book_id, borrower, audit).await
    }

    async fn update_loan(&mut self, record: &TransactionRecord, audit: &Audit) -> AppResult<()> {
        HistoryRepository::update(&mut self.tx, record, audit).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
