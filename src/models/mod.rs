//! Data models for Book Network

pub mod audit;
pub mod book;
pub mod loan;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use audit::Audit;
pub use book::{Book, BookResponse, CreateBook};
pub use loan::{BorrowedBook, BorrowedBookResponse, LoanState, TransactionRecord};
pub use page::{Page, PageQuery, PageRequest, PageResponse};
pub use user::{User, UserClaims, UserInfo};
