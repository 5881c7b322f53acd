//! Authors repository: insert-or-get resolution and batched lookups.

use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::author::{normalize_author_name, Author},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Resolve `name` to an author id on a dedicated connection.
    pub async fn ensure(&self, name: &str) -> AppResult<i32> {
        let mut conn = self.pool.acquire().await?;
        ensure_author(&mut conn, name).await
    }

    /// Exact (case-sensitive) lookup by trimmed name
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }
}

/// Insert author if new, or return the existing id.
///
/// Concurrent callers resolving the same new name converge on one row: the
/// losing insert is dropped by `ON CONFLICT DO NOTHING` and the re-lookup
/// returns the winner's id.
pub async fn ensure_author(conn: &mut PgConnection, name: &str) -> AppResult<i32> {
    let name = normalize_author_name(name)?;

    if let Some(id) = find_author_id(&mut *conn, &name).await? {
        return Ok(id);
    }

    let inserted: Option<i32> = sqlx::query_scalar(
        "INSERT INTO authors (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING id",
    )
    .bind(&name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        tracing::debug!("Created author id={} name={:?}", id, name);
        return Ok(id);
    }

    match find_author_id(&mut *conn, &name).await? {
        Some(id) => Ok(id),
        None => {
            tracing::error!("Author {:?} neither inserted nor found after conflict", name);
            Err(AppError::Database(sqlx::Error::RowNotFound))
        }
    }
}

async fn find_author_id(conn: &mut PgConnection, name: &str) -> AppResult<Option<i32>> {
    let id = sqlx::query_scalar("SELECT id FROM authors WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Load the authors of many books with a single query.
///
/// Books without authors are absent from the returned map.
pub async fn load_for_books(
    conn: &mut PgConnection,
    book_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<Author>>> {
    let mut authors: HashMap<i32, Vec<Author>> = HashMap::new();
    if book_ids.is_empty() {
        return Ok(authors);
    }

    let rows: Vec<(i32, i32, String)> = sqlx::query_as(
        r#"
        SELECT ba.book_id, a.id, a.name
        FROM book_authors ba
        JOIN authors a ON a.id = ba.author_id
        WHERE ba.book_id = ANY($1)
        ORDER BY ba.book_id, a.name
        "#,
    )
    .bind(book_ids)
    .fetch_all(conn)
    .await?;

    for (book_id, id, name) in rows {
        authors.entry(book_id).or_default().push(Author { id, name });
    }

    Ok(authors)
}
