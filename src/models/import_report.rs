//! Import report models for best-effort bulk import.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::Book;

/// A record that was rejected and rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportFailure {
    /// Zero-based position in the submitted batch
    pub index: usize,
    pub message: String,
}

/// Outcome of a best-effort import: every record lands in exactly one list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub created: Vec<Book>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<ImportFailure>,
}
