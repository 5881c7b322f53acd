//! Books repository for database operations.
//!
//! Every mutating method is one unit of work: it begins a transaction, runs
//! all of its statements on that transaction and commits once. Any early
//! return drops the transaction, which rolls it back.

use sqlx::{Connection, PgConnection, Pool, Postgres};

use super::{
    authors::{ensure_author, load_for_books},
    begin,
    query::build_list_query,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookFilter, BookPatch, BookRow, NewBook, SortField, SortOrder},
        import_report::{ImportFailure, ImportReport},
    },
};

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

    /// Get a book with its authors; `None` when it does not exist.
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id).await
    }

    /// List books matching `filter`, one page at a time.
    ///
    /// Authors for the whole page are loaded with one batched query.
    pub async fn list(
        &self,
        filter: &BookFilter,
        sort_by: SortField,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Book>> {
        if limit < 1 {
            return Err(AppError::Validation(format!("Invalid limit {}: must be at least 1", limit)));
        }
        if offset < 0 {
            return Err(AppError::Validation(format!("Invalid offset {}: must not be negative", offset)));
        }

        let mut conn = self.pool.acquire().await?;

        let mut qb = build_list_query(filter, sort_by, order, limit, offset);
        tracing::debug!("Listing books: {}", qb.sql());
        let rows = qb.build_query_as::<BookRow>().fetch_all(&mut *conn).await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut authors = load_for_books(&mut conn, &ids).await?;

        rows.into_iter()
            .map(|row| {
                let book_authors = authors.remove(&row.id).unwrap_or_default();
                row.into_book(book_authors)
            })
            .collect()
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a book and link its authors. Invalid input is rejected before any write.
    pub async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let book = book.normalized()?;

        let mut tx = begin(&self.pool).await?;
        let created = insert_book(&mut tx, &book).await?;
        tx.commit().await?;

        tracing::info!("Created book id={} title={:?}", created.id, created.title);
        Ok(created)
    }

    /// Create every book or none of them.
    ///
    /// All records are validated before the first insert; the offending
    /// record is named by its position in `books`.
    pub async fn import(&self, books: &[NewBook]) -> AppResult<Vec<Book>> {
        let normalized = books
            .iter()
            .enumerate()
            .map(|(index, book)| {
                book.normalized().map_err(|e| AppError::InvalidRecord {
                    index,
                    message: validation_message(e),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let mut tx = begin(&self.pool).await?;
        let mut created = Vec::with_capacity(normalized.len());
        for book in &normalized {
            created.push(insert_book(&mut tx, book).await?);
        }
        tx.commit().await?;

        tracing::info!("Imported {} books", created.len());
        Ok(created)
    }

    /// Create each book in its own savepoint; rejected records are reported
    /// instead of aborting the batch.
    ///
    /// Only validation failures and constraint conflicts are absorbed. Any
    /// other storage error rolls the whole batch back.
    pub async fn import_best_effort(&self, books: &[(usize, NewBook)]) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut tx = begin(&self.pool).await?;

        for (index, book) in books {
            let book = match book.normalized() {
                Ok(book) => book,
                Err(e) => {
                    report.failed.push(ImportFailure { index: *index, message: validation_message(e) });
                    continue;
                }
            };

            let mut savepoint = Connection::begin(&mut *tx).await?;
            match insert_book(&mut savepoint, &book).await {
                Ok(created) => {
                    savepoint.commit().await?;
                    report.created.push(created);
                }
                Err(AppError::Conflict(message)) => {
                    savepoint.rollback().await?;
                    tracing::warn!("Import record #{} rejected: {}", index, message);
                    report.failed.push(ImportFailure { index: *index, message });
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Best-effort import: {} created, {} rejected",
            report.created.len(),
            report.failed.len()
        );
        Ok(report)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Apply a partial update; `None` when the book does not exist, whatever the patch holds.
    ///
    /// The patch is validated after the row is locked and before the first
    /// write. When `authors` is present the link set is replaced, not merged.
    pub async fn update(&self, id: i32, patch: &BookPatch) -> AppResult<Option<Book>> {
        let mut tx = begin(&self.pool).await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let patch = patch.normalized()?;

        if patch.touches_book_row() {
            sqlx::query(
                r#"
                UPDATE books SET
                    title = COALESCE($1::text, title),
                    genre = COALESCE($2::text, genre),
                    published_year = COALESCE($3::int4, published_year)
                WHERE id = $4
                "#,
            )
            .bind(patch.title.as_deref())
            .bind(patch.genre.map(|g| g.as_str()))
            .bind(patch.published_year)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(authors) = &patch.authors {
            unlink_all_authors(&mut tx, id).await?;
            if let Some(names) = authors {
                link_authors(&mut tx, id, names).await?;
            }
        }

        let updated = fetch_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished during update", id)))?;
        tx.commit().await?;

        tracing::info!("Updated book id={}", id);
        Ok(Some(updated))
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Delete a book and its author links. Authors themselves are kept.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = begin(&self.pool).await?;

        unlink_all_authors(&mut tx, id).await?;
        let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        if deleted {
            tracing::info!("Deleted book id={}", id);
        }
        Ok(deleted)
    }
}

// =============================================================================
// Connection-level helpers, shared by every unit of work above
// =============================================================================

async fn fetch_book(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
    let row = sqlx::query_as::<_, BookRow>(
        "SELECT id, title, genre, published_year FROM books WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut authors = load_for_books(conn, &[id]).await?;
    row.into_book(authors.remove(&id).unwrap_or_default()).map(Some)
}

/// Insert an already normalized book and read it back on the same connection.
async fn insert_book(conn: &mut PgConnection, book: &NewBook) -> AppResult<Book> {
    let book_id: i32 = sqlx::query_scalar(
        "INSERT INTO books (title, genre, published_year) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&book.title)
    .bind(book.genre.as_str())
    .bind(book.published_year)
    .fetch_one(&mut *conn)
    .await?;

    link_authors(&mut *conn, book_id, &book.authors).await?;

    fetch_book(conn, book_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Book {} missing right after insert", book_id)))
}

/// Names are resolved in sorted order so concurrent transactions take the
/// `authors` unique-index locks in the same sequence.
async fn link_authors(conn: &mut PgConnection, book_id: i32, names: &[String]) -> AppResult<()> {
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort_unstable();

    for name in sorted {
        let author_id = ensure_author(&mut *conn, name).await?;

        sqlx::query(
            r#"
            INSERT INTO book_authors (book_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (book_id, author_id) DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(author_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn unlink_all_authors(conn: &mut PgConnection, book_id: i32) -> AppResult<()> {
    sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
        .bind(book_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn validation_message(err: AppError) -> String {
    match err {
        AppError::Validation(message) => message,
        other => other.to_string(),
    }
}
