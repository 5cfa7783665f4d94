//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod publisher;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorBookCount};
pub use book::{Book, BookQuery, NestedRef};
pub use publisher::Publisher;
pub use user::{User, UserInfo};
