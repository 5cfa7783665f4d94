//! Book model and nested payload types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::Author, publisher::Publisher};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Flat row produced by joining books with their author and publisher
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    id: i32,
    title: String,
    author_id: i32,
    author_name: String,
    publisher_id: i32,
    publisher_name: String,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            author: Author {
                id: row.author_id,
                name: row.author_name,
            },
            publisher: Publisher {
                id: row.publisher_id,
                name: row.publisher_name,
            },
        }
    }
}

/// Book with its author and publisher nested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Author,
    pub publisher: Publisher,
}

/// Reference to a related author or publisher inside a book payload.
///
/// On create, an `id` links the existing record and a bare `name` always
/// inserts a new one. On update, an `id` relinks and a `name` renames.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct NestedRef {
    pub id: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(nested)]
    pub author: NestedRef,
    #[validate(nested)]
    pub publisher: NestedRef,
}

/// Update book request (every field optional)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    #[validate(nested)]
    pub author: Option<NestedRef>,
    #[validate(nested)]
    pub publisher: Option<NestedRef>,
}

/// Filter and pagination parameters for the book list
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact author name
    #[serde(alias = "author__name")]
    pub author_name: Option<String>,
    /// Exact publisher name
    #[serde(alias = "publisher__name")]
    pub publisher_name: Option<String>,
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 20, max: 100)
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    /// Whether this page holds any of `total` results. The first page always
    /// exists, even for an empty result set.
    pub fn page_exists(&self, total: i64) -> bool {
        self.page() == 1 || self.offset() < total
    }
}
