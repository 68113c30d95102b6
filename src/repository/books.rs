//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Audit, Book, CreateBook, Page, PageRequest},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Create a new book owned by the audit actor
    pub async fn create(&self, book: &CreateBook, audit: &Audit) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author_name, isbn, synopsis, shareable, archived,
                               owner_id, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author_name)
        .bind(&book.isbn)
        .bind(&book.synopsis)
        .bind(book.shareable)
        .bind(&audit.actor)
        .bind(audit.at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Shareable, non archived books that the user does not own
    pub async fn list_displayable(&self, user: &str, page: PageRequest) -> AppResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE shareable AND NOT archived AND owner_id <> $1",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;

        let content = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE shareable AND NOT archived AND owner_id <> $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { content, total })
    }

    /// Books owned by the user, whatever their flags
    pub async fn list_by_owner(&self, owner: &str, page: PageRequest) -> AppResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE owner_id = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let content = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { content, total })
    }

    /// Get a book and lock its row until the surrounding transaction ends
    pub async fn lock_by_id(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(book)
    }

    /// Persist the mutable columns of a book (flags and cover)
    pub async fn update(conn: &mut PgConnection, book: &Book, audit: &Audit) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET shareable = $1, archived = $2, book_cover = $3,
                last_modified_by = $4, last_modified_at = $5
            WHERE id = $6
            "#,
        )
        .bind(book.shareable)
        .bind(book.archived)
        .bind(&book.book_cover)
        .bind(&audit.actor)
        .bind(audit.at)
        .bind(book.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No book found with the ID: {}", book.id)));
        }
        Ok(())
    }
}
