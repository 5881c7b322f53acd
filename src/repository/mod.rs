//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod query;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub authors: authors::AuthorsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Begin a unit of work.
///
/// The transaction rolls back when dropped without `commit`, so every `?`
/// between `begin` and `commit` releases the connection with nothing applied.
pub(crate) async fn begin(pool: &Pool<Postgres>) -> AppResult<Transaction<'static, Postgres>> {
    Ok(pool.begin().await?)
}
