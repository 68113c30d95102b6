//! Book catalog service: creation, listings, flags and covers

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Audit, Book, BookResponse, CreateBook, Page, PageRequest, PageResponse},
    repository::LendingStore,
    services::storage::FileStorage,
};

#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn LendingStore>,
    storage: Arc<dyn FileStorage>,
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("No book found with the ID: {}", id))
}

impl BookService {
    pub fn new(store: Arc<dyn LendingStore>, storage: Arc<dyn FileStorage>) -> Self {
        Self { store, storage }
    }

    /// Create a book owned by `owner`
    pub async fn create_book(&self, owner: &str, request: CreateBook) -> AppResult<i32> {
        request.validate()?;

        let audit = Audit::now(owner);
        let id = self.store.insert_book(&request, &audit).await?;

        tracing::info!(book_id = id, owner, "Book created");
        Ok(id)
    }

    /// Get book details by ID
    pub async fn get_book(&self, id: i32) -> AppResult<BookResponse> {
        let book = self.store.book_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(self.to_response(book).await)
    }

    /// Books other users may borrow
    pub async fn list_displayable(
        &self,
        user: &str,
        page: PageRequest,
    ) -> AppResult<PageResponse<BookResponse>> {
        let books = self.store.displayable_books(user, page).await?;
        self.to_page(books, page).await
    }

    /// Books owned by the user
    pub async fn list_owned(
        &self,
        owner: &str,
        page: PageRequest,
    ) -> AppResult<PageResponse<BookResponse>> {
        let books = self.store.books_by_owner(owner, page).await?;
        self.to_page(books, page).await
    }

    pub async fn toggle_shareable(&self, id: i32, user: &str) -> AppResult<i32> {
        let book = self
            .update_owned(
                id,
                user,
                "You cannot update the shareable status of a book you do not own",
                Book::toggle_shareable,
            )
            .await?;

        tracing::info!(book_id = id, shareable = book.shareable, "Book shareable status updated");
        Ok(id)
    }

    pub async fn toggle_archived(&self, id: i32, user: &str) -> AppResult<i32> {
        let book = self
            .update_owned(
                id,
                user,
                "You cannot update the archived status of a book you do not own",
                Book::toggle_archived,
            )
            .await?;

        tracing::info!(book_id = id, archived = book.archived, "Book archived status updated");
        Ok(id)
    }

    /// Store a cover image and attach it to the book, replacing any previous one
    pub async fn set_cover(
        &self,
        id: i32,
        user: &str,
        extension: Option<String>,
        data: Vec<u8>,
    ) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let mut book = tx.lock_book(id).await?.ok_or_else(|| not_found(id))?;
        if !book.is_owned_by(user) {
            return Err(AppError::PermissionDenied(
                "You cannot change the cover of a book you do not own".to_string(),
            ));
        }
        if data.is_empty() {
            return Err(AppError::Validation("Cover file is empty".to_string()));
        }

        let reference = self.storage.save(user, extension, &data).await?;
        let previous = book.book_cover.replace(reference.clone());

        let saved = match tx.update_book(&book, &Audit::now(user)).await {
            Ok(()) => tx.commit().await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            self.discard(&reference, "Cover not attached to book").await;
            return Err(e);
        }

        if let Some(previous) = previous {
            self.discard(&previous, "Replaced book cover").await;
        }

        tracing::info!(book_id = id, size = data.len(), "Book cover updated");
        Ok(())
    }

    /// Remove a stored file that no book references anymore
    async fn discard(&self, reference: &str, reason: &str) {
        if let Err(e) = self.storage.remove(reference).await {
            tracing::warn!(reference, reason, error = %e, "Orphaned cover file left in storage");
        }
    }

    /// Lock the book, check ownership, apply `change` and persist it
    async fn update_owned<F>(&self, id: i32, user: &str, denied: &str, change: F) -> AppResult<Book>
    where
        F: FnOnce(&mut Book) + Send,
    {
        let mut tx = self.store.begin().await?;
        let mut book = tx.lock_book(id).await?.ok_or_else(|| not_found(id))?;
        if !book.is_owned_by(user) {
            return Err(AppError::PermissionDenied(denied.to_string()));
        }

        change(&mut book);
        tx.update_book(&book, &Audit::now(user)).await?;
        tx.commit().await?;
        Ok(book)
    }

    async fn to_page(
        &self,
        books: Page<Book>,
        page: PageRequest,
    ) -> AppResult<PageResponse<BookResponse>> {
        let mut content = Vec::with_capacity(books.content.len());
        for book in books.content {
            content.push(self.to_response(book).await);
        }

        Ok(PageResponse::new(
            Page {
                content,
                total: books.total,
            },
            page,
        ))
    }

    async fn to_response(&self, book: Book) -> BookResponse {
        let cover = match book.book_cover.as_deref() {
            Some(reference) => match self.storage.read(reference).await {
                Ok(data) => data.map(|bytes| STANDARD.encode(bytes)),
                Err(e) => {
                    tracing::warn!(book_id = book.id, error = %e, "Failed to read book cover");
                    None
                }
            },
            None => None,
        };
        BookResponse::from_book(book, cover)
    }
}
