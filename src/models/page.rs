//! Pagination types shared by every listing

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{book::BookResponse, loan::BorrowedBookResponse};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page query parameters (`page` is 0-based)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number, starting at 0 (default: 0)
    pub page: Option<i64>,
    /// Page size (default: 10, max: 100)
    pub size: Option<i64>,
}

/// Normalized page request passed to the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.max(0),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Row offset; saturates for page numbers far past the end
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

impl From<&PageQuery> for PageRequest {
    fn from(query: &PageQuery) -> Self {
        PageRequest::new(
            query.page.unwrap_or(0),
            query.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// A slice of rows plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = PageResponse<BookResponse>,
    BorrowedBookPage = PageResponse<BorrowedBookResponse>
)]
pub struct PageResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub content: Vec<T>,
    /// Current page number (0-based)
    pub number: i64,
    /// Requested page size
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> PageResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(page: Page<T>, request: PageRequest) -> Self {
        let total_pages = if page.total == 0 {
            0
        } else {
            (page.total + request.size - 1) / request.size
        };

        Self {
            content: page.content,
            number: request.page,
            size: request.size,
            total_elements: page.total,
            total_pages,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }
}
