//! Catalog management service

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookPatch, BookQuery, NewBook},
        import_report::{ImportFailure, ImportReport},
    },
    repository::Repository,
};

use super::import::decode_record;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Search books with filters, sorting and a bounded page window
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let limit = query.limit.unwrap_or(self.config.default_page_size);
        if limit > self.config.max_page_size {
            return Err(AppError::Validation(format!(
                "Invalid limit {}: at most {} books per page",
                limit, self.config.max_page_size
            )));
        }

        self.repository
            .books
            .list(
                &query.filter(),
                query.sort_field(),
                query.sort_order(),
                limit,
                query.offset.unwrap_or(0),
            )
            .await
    }

    /// Get book by ID; absence is not an error here
    pub async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        self.repository.books.create(book).await
    }

    /// Apply a partial update given as a JSON object.
    ///
    /// Unknown keys or mistyped values are rejected before the book is looked up.
    pub async fn update_book(&self, id: i32, fields: serde_json::Value) -> AppResult<Option<Book>> {
        // serde would otherwise fill the fields of a JSON array by position
        if !fields.is_object() {
            return Err(AppError::Validation(
                "Malformed update payload: expected a JSON object".to_string(),
            ));
        }

        let patch: BookPatch = serde_json::from_value(fields)
            .map_err(|e| AppError::Validation(format!("Malformed update payload: {}", e)))?;

        self.repository.books.update(id, &patch).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<bool> {
        self.repository.books.delete(id).await
    }

    /// All-or-nothing import: the first bad record rejects the whole batch.
    pub async fn bulk_import(&self, records: Vec<serde_json::Value>) -> AppResult<Vec<Book>> {
        self.check_batch_size(records.len())?;

        let books = records
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode_record(index, value))
            .collect::<AppResult<Vec<_>>>()
            .inspect_err(|e| tracing::warn!("Bulk import rejected: {}", e))?;

        self.repository.books.import(&books).await
    }

    /// Partial-success import: bad records are reported, the rest are committed.
    pub async fn import_best_effort(&self, records: Vec<serde_json::Value>) -> AppResult<ImportReport> {
        self.check_batch_size(records.len())?;

        let mut decoded = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for (index, value) in records.into_iter().enumerate() {
            match decode_record(index, value) {
                Ok(book) => decoded.push((index, book)),
                Err(AppError::InvalidRecord { index, message }) => {
                    tracing::warn!("Import record #{} rejected: {}", index, message);
                    rejected.push(ImportFailure { index, message });
                }
                Err(e) => return Err(e),
            }
        }

        let mut report = self.repository.books.import_best_effort(&decoded).await?;
        report.failed.extend(rejected);
        report.failed.sort_by_key(|failure| failure.index);
        Ok(report)
    }

    fn check_batch_size(&self, len: usize) -> AppResult<()> {
        if len == 0 {
            return Err(AppError::Validation("No books provided for import".to_string()));
        }
        if len > self.config.max_import_records {
            return Err(AppError::Validation(format!(
                "Too many records: {} (at most {} per import)",
                len, self.config.max_import_records
            )));
        }
        Ok(())
    }
}
