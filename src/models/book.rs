//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub synopsis: Option<String>,
    /// Reference returned by the file storage for the cover image
    pub book_cover: Option<String>,
    pub archived: bool,
    pub shareable: bool,
    /// Identity of the owner (the login that created the book)
    pub owner_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Whether other users may borrow or return this book right now
    pub fn is_lendable(&self) -> bool {
        self.shareable && !self.archived
    }

    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner_id == user
    }

    pub fn toggle_shareable(&mut self) {
        self.shareable = !self.shareable;
    }

    pub fn toggle_archived(&mut self) {
        self.archived = !self.archived;
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is mandatory"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author name is mandatory"))]
    pub author_name: String,
    #[validate(length(min = 1, max = 20, message = "ISBN must be 1 to 20 characters"))]
    pub isbn: String,
    pub synopsis: Option<String>,
    #[serde(default)]
    pub shareable: bool,
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub synopsis: Option<String>,
    pub owner: String,
    /// Base64 encoded cover image
    pub cover: Option<String>,
    pub archived: bool,
    pub shareable: bool,
}

impl BookResponse {
    pub fn from_book(book: Book, cover: Option<String>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author_name: book.author_name,
            isbn: book.isbn,
            synopsis: book.synopsis,
            owner: book.owner_id,
            cover,
            archived: book.archived,
            shareable: book.shareable,
        }
    }
}
