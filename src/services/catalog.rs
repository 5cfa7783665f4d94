//! Catalog management service: publishers, authors and books

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorBookCount, CreateAuthor, UpdateAuthor},
        book::{Book, BookQuery, CreateBook, UpdateBook},
        publisher::{CreatePublisher, Publisher, UpdatePublisher},
    },
    repository::Repository,
};

/// Number of entries in the top authors report
pub const TOP_AUTHORS_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // PUBLISHERS
    // =========================================================================

    pub async fn list_publishers(&self) -> AppResult<Vec<Publisher>> {
        self.repository.publishers.list().await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.repository.publishers.get_by_id(id).await
    }

    pub async fn create_publisher(&self, data: &CreatePublisher) -> AppResult<Publisher> {
        data.validate()?;
        let publisher = self.repository.publishers.create(data).await?;
        tracing::info!("Created publisher id={}", publisher.id);
        Ok(publisher)
    }

    pub async fn update_publisher(&self, id: i32, data: &UpdatePublisher) -> AppResult<Publisher> {
        data.validate()?;
        self.repository.publishers.update(id, data).await
    }

    pub async fn delete_publisher(&self, id: i32) -> AppResult<()> {
        self.repository.publishers.delete(id).await?;
        tracing::info!("Deleted publisher id={} and its books", id);
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, data: &CreateAuthor) -> AppResult<Author> {
        data.validate()?;
        let author = self.repository.authors.create(data).await?;
        tracing::info!("Created author id={}", author.id);
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        data.validate()?;
        self.repository.authors.update(id, data).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!("Deleted author id={} and their books", id);
        Ok(())
    }

    /// Authors with the most books
    pub async fn top_authors(&self) -> AppResult<Vec<AuthorBookCount>> {
        self.repository.authors.top_by_book_count(TOP_AUTHORS_LIMIT).await
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Filtered, paginated book list
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (books, total) = self.repository.books.search(query).await?;
        if !query.page_exists(total) {
            return Err(AppError::NotFound(format!("Invalid page {}", query.page())));
        }
        Ok((books, total))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        data.validate()?;
        let book = self.repository.books.create(data).await?;
        tracing::info!(
            "Created book id={} (author id={}, publisher id={})",
            book.id,
            book.author.id,
            book.publisher.id
        );
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        data.validate()?;
        self.repository.books.update(id, data).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
