//! In-memory [`LendingStore`] and [`UserStore`] used by service and router tests

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LendingStore, LendingTx, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, User},
        Audit, Book, BorrowedBook, CreateBook, Page, PageRequest, TransactionRecord,
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub books: Vec<Book>,
    pub records: Vec<TransactionRecord>,
    pub users: Vec<User>,
}

impl MemoryState {
    fn borrowed_book(&self, record: &TransactionRecord) -> Option<BorrowedBook> {
        let book = self.books.iter().find(|b| b.id == record.book_id)?;
        Some(BorrowedBook {
            id: record.id,
            book_id: book.id,
            user_id: record.user_id.clone(),
            title: book.title.clone(),
            author_name: book.author_name.clone(),
            isbn: book.isbn.clone(),
            returned: record.returned,
            return_approved: record.return_approved,
            created_at: record.created_at,
        })
    }

    fn owner_of(&self, book_id: i32) -> Option<&str> {
        self.books
            .iter()
            .find(|b| b.id == book_id)
            .map(|b| b.owner_id.as_str())
    }
}

/// Whole-store lock per transaction, so transactions are serializable
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Insert a book directly, bypassing the service rules
    pub async fn seed_book(&self, owner: &str, shareable: bool, archived: bool) -> i32 {
        let mut state = self.state.lock().await;
        let id = state.books.len() as i32 + 1;
        let audit = Audit::now(owner);
        state.books.push(Book {
            id,
            title: format!("Book {}", id),
            author_name: "Author".to_string(),
            isbn: format!("isbn-{}", id),
            synopsis: None,
            book_cover: None,
            archived,
            shareable,
            owner_id: owner.to_string(),
            created_by: owner.to_string(),
            created_at: audit.at,
            last_modified_by: None,
            last_modified_at: None,
        });
        id
    }

    /// Insert an account directly with the given password hash and flags
    pub async fn seed_user(
        &self,
        login: &str,
        password_hash: &str,
        account_locked: bool,
        enabled: bool,
    ) -> i32 {
        let mut state = self.state.lock().await;
        let id = state.users.len() as i32 + 1;
        state.users.push(User {
            id,
            login: login.to_string(),
            firstname: None,
            lastname: None,
            email: None,
            password: password_hash.to_string(),
            account_locked,
            enabled,
            created_at: chrono::Utc::now(),
            updated_at: None,
        });
        id
    }
}

fn paginate<T: Clone>(rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as i64;
    let content = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .collect();
    Page { content, total }
}

fn newest_first_books(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    books
}

fn newest_first_loans(mut rows: Vec<BorrowedBook>) -> Vec<BorrowedBook> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows
}

#[async_trait]
impl LendingStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.id == id).cloned())
    }

    async fn insert_book(&self, book: &CreateBook, audit: &Audit) -> AppResult<i32> {
        let mut state = self.state.lock().await;
        let id = state.books.len() as i32 + 1;
        state.books.push(Book {
            id,
            title: book.title.clone(),
            author_name: book.author_name.clone(),
            isbn: book.isbn.clone(),
            synopsis: book.synopsis.clone(),
            book_cover: None,
            archived: false,
            shareable: book.shareable,
            owner_id: audit.actor.clone(),
            created_by: audit.actor.clone(),
            created_at: audit.at,
            last_modified_by: None,
            last_modified_at: None,
        });
        Ok(id)
    }

    async fn displayable_books(&self, user: &str, page: PageRequest) -> AppResult<Page<Book>> {
        let state = self.state.lock().await;
        let books = state
            .books
            .iter()
            .filter(|b| b.is_lendable() && !b.is_owned_by(user))
            .cloned()
            .collect();
        Ok(paginate(newest_first_books(books), page))
    }

    async fn books_by_owner(&self, owner: &str, page: PageRequest) -> AppResult<Page<Book>> {
        let state = self.state.lock().await;
        let books = state
            .books
            .iter()
            .filter(|b| b.is_owned_by(owner))
            .cloned()
            .collect();
        Ok(paginate(newest_first_books(books), page))
    }

    async fn loans_by_borrower(
        &self,
        borrower: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        let state = self.state.lock().await;
        let rows = state
            .records
            .iter()
            .filter(|r| r.user_id == borrower)
            .filter_map(|r| state.borrowed_book(r))
            .collect();
        Ok(paginate(newest_first_loans(rows), page))
    }

    async fn returns_to_owner(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<Page<BorrowedBook>> {
        let state = self.state.lock().await;
        let rows = state
            .records
            .iter()
            .filter(|r| r.returned && !r.return_approved)
            .filter(|r| state.owner_of(r.book_id) == Some(owner))
            .filter_map(|r| state.borrowed_book(r))
            .collect();
        Ok(paginate(newest_first_loans(rows), page))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.login.eq_ignore_ascii_case(login))
            .cloned())
    }

    async fn login_exists(&self, login: &str) -> AppResult<bool> {
        Ok(self.get_by_login(login).await?.is_some())
    }

    async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User> {
        let mut state = self.state.lock().await;
        // Same guarantee as the unique index on LOWER(login)
        if state.users.iter().any(|u| u.login.eq_ignore_ascii_case(&user.login)) {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let created = User {
            id: state.users.len() as i32 + 1,
            login: user.login.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            email: user.email.clone(),
            password: password_hash.to_string(),
            account_locked: false,
            enabled: true,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.password = password_hash.to_string();
        user.updated_at = Some(chrono::Utc::now());
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LendingTx for MemoryTx {
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.working.books.iter().find(|b| b.id == id).cloned())
    }

    async fn update_book(&mut self, book: &Book, audit: &Audit) -> AppResult<()> {
        let stored = self
            .working
            .books
            .iter_mut()
            .find(|b| b.id == book.id)
            .ok_or_else(|| AppError::NotFound(format!("No book found with the ID: {}", book.id)))?;
        stored.shareable = book.shareable;
        stored.archived = book.archived;
        stored.book_cover = book.book_cover.clone();
        stored.last_modified_by = Some(audit.actor.clone());
        stored.last_modified_at = Some(audit.at);
        Ok(())
    }

    async fn has_open_loan(&mut self, book_id: i32, borrower: &str) -> AppResult<bool> {
        Ok(self
            .working
            .records
            .iter()
            .any(|r| r.book_id == book_id && r.user_id == borrower && r.is_open()))
    }

    async fn borrowed_loan(
        &mut self,
        book_id: i32,
        borrower: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        Ok(self
            .working
            .records
            .iter()
            .find(|r| {
                r.book_id == book_id && r.user_id == borrower && !r.returned && !r.return_approved
            })
            .cloned())
    }

    async fn return_requested_loan(
        &mut self,
        book_id: i32,
        owner: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        if self.working.owner_of(book_id) != Some(owner) {
            return Ok(None);
        }
        Ok(self
            .working
            .records
            .iter()
            .filter(|r| r.book_id == book_id && r.returned && !r.return_approved)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn insert_loan(&mut self, book_id: i32, borrower: &str, audit: &Audit) -> AppResult<i32> {
        let id = self.working.records.len() as i32 + 1;
        self.working.records.push(TransactionRecord {
            id,
            user_id: borrower.to_string(),
            book_id,
            returned: false,
            return_approved: false,
            created_by: audit.actor.clone(),
            created_at: audit.at,
            last_modified_by: None,
            last_modified_at: None,
        });
        Ok(id)
    }

    async fn update_loan(&mut self, record: &TransactionRecord, audit: &Audit) -> AppResult<()> {
        let stored = self
            .working
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("No transaction found with the ID: {}", record.id))
            })?;
        stored.returned = record.returned;
        stored.return_approved = record.return_approved;
        stored.last_modified_by = Some(audit.actor.clone());
        stored.last_modified_at = Some(audit.at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
