//! Data models for Bookshelf

pub mod author;
pub mod book;
pub mod import_report;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookFilter, BookPatch, BookQuery, Genre, NewBook, SortField, SortOrder};
pub use import_report::{ImportFailure, ImportReport};
