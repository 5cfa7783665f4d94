//! Books repository, including nested author/publisher resolution

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookRow, CreateBook, NestedRef, UpdateBook},
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title,
           a.id AS author_id, a.name AS author_name,
           p.id AS publisher_id, p.name AS publisher_name
    FROM books b
    JOIN authors a ON a.id = b.author_id
    JOIN publishers p ON p.id = b.publisher_id
"#;

/// Tables a book can point at through a nested payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Related {
    Author,
    Publisher,
}

impl Related {
    fn table(self) -> &'static str {
        match self {
            Related::Author => "authors",
            Related::Publisher => "publishers",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Related::Author => "Author",
            Related::Publisher => "Publisher",
        }
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// List all books
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let query = format!("{} ORDER BY b.id", BOOK_SELECT);
        let rows = sqlx::query_as::<_, BookRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!("{} WHERE b.id = $1", BOOK_SELECT);
        sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::from)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Filter books by exact author/publisher name with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref author_name) = query.author_name {
            params.push(author_name.clone());
            conditions.push(format!("a.name = ${}", params.len()));
        }

        if let Some(ref publisher_name) = query.publisher_name {
            params.push(publisher_name.clone());
            conditions.push(format!("p.name = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            r#"
            SELECT COUNT(*) FROM books b
            JOIN authors a ON a.id = b.author_id
            JOIN publishers p ON p.id = b.publisher_id
            {}
            "#,
            where_clause
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY b.id LIMIT {} OFFSET {}",
            BOOK_SELECT,
            where_clause,
            query.per_page(),
            query.offset()
        );

        let mut select_builder = sqlx::query_as::<_, BookRow>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(Book::from).collect(), total))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a book together with any author/publisher it names.
    /// Everything happens in one transaction.
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let author_id = resolve_related(&mut tx, Related::Author, &data.author).await?;
        let publisher_id = resolve_related(&mut tx, Related::Publisher, &data.publisher).await?;

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO books (title, author_id, publisher_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&data.title)
        .bind(author_id)
        .bind(publisher_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Update title and relations of a book in one transaction
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let (mut author_id, mut publisher_id) = sqlx::query_as::<_, (i32, i32)>(
            "SELECT author_id, publisher_id FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        if let Some(ref author) = data.author {
            author_id = apply_related(&mut tx, Related::Author, author_id, author).await?;
        }

        if let Some(ref publisher) = data.publisher {
            publisher_id = apply_related(&mut tx, Related::Publisher, publisher_id, publisher).await?;
        }

        sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($1, title),
                author_id = $2,
                publisher_id = $3
            WHERE id = $4
            "#,
        )
        .bind(data.title.as_deref())
        .bind(author_id)
        .bind(publisher_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }
}

async fn related_exists(conn: &mut PgConnection, related: Related, id: i32) -> AppResult<bool> {
    let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", related.table());
    let exists: bool = sqlx::query_scalar(&query)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// Return the id of the referenced record: an explicit `id` must exist,
/// a bare `name` always inserts a record owned by this book.
async fn resolve_related(
    conn: &mut PgConnection,
    related: Related,
    nested: &NestedRef,
) -> AppResult<i32> {
    if let Some(id) = nested.id {
        if !related_exists(conn, related, id).await? {
            return Err(AppError::BadRequest(format!(
                "{} {} does not exist",
                related.label(),
                id
            )));
        }
        return Ok(id);
    }

    let name = nested.name.as_deref().ok_or_else(|| {
        AppError::Validation(format!("{} requires either an id or a name", related.label()))
    })?;

    let insert_query = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id", related.table());
    let id: i32 = sqlx::query_scalar(&insert_query)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    tracing::debug!("Created {} {} for book payload", related.table(), id);
    Ok(id)
}

/// Apply a nested update: relink to another record when `id` changes,
/// then rename the resulting record when `name` is given.
async fn apply_related(
    conn: &mut PgConnection,
    related: Related,
    current_id: i32,
    nested: &NestedRef,
) -> AppResult<i32> {
    let target_id = match nested.id {
        Some(id) if id != current_id => {
            if !related_exists(conn, related, id).await? {
                return Err(AppError::BadRequest(format!(
                    "{} {} does not exist",
                    related.label(),
                    id
                )));
            }
            id
        }
        _ => current_id,
    };

    if let Some(ref name) = nested.name {
        let query = format!("UPDATE {} SET name = $1 WHERE id = $2", related.table());
        sqlx::query(&query)
            .bind(name)
            .bind(target_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(target_id)
}
