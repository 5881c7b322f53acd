//! Book model and related types.
//!
//! Validation helpers live here so that every write path (single create,
//! partial update, bulk import) applies exactly the same rules before
//! touching the store.

use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::{normalize_author_names, Author};
use crate::error::{AppError, AppResult};

/// Oldest accepted publication year
pub const MIN_PUBLISHED_YEAR: i32 = 1800;

/// Current calendar year (UTC), the newest accepted publication year
pub fn current_year() -> i32 {
    Utc::now().year()
}

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// Book genre. Stored as its display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Science,
    History,
}

impl Genre {
    pub const ALL: [Genre; 4] = [Genre::Fiction, Genre::NonFiction, Genre::Science, Genre::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Science => "Science",
            Genre::History => "History",
        }
    }

    /// Case-insensitive match, used for loosely formatted import records.
    pub fn parse_loose(s: &str) -> Option<Genre> {
        let s = s.trim();
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
    }
}

impl FromStr for Genre {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Invalid genre: {}", s)))
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Full book with its resolved authors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub genre: Genre,
    pub published_year: i32,
    pub authors: Vec<Author>,
}

/// Raw `books` row, before authors are attached
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub genre: String,
    pub published_year: i32,
}

impl BookRow {
    pub fn into_book(self, authors: Vec<Author>) -> AppResult<Book> {
        let genre = self.genre.parse::<Genre>().map_err(|_| {
            AppError::Internal(format!("Book {} has unknown genre {:?}", self.id, self.genre))
        })?;
        Ok(Book {
            id: self.id,
            title: self.title,
            genre,
            published_year: self.published_year,
            authors,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    pub title: String,
    pub genre: Genre,
    pub published_year: i32,
    /// Author names; duplicates collapse into a single link
    #[validate(length(min = 1, message = "at least one author is required"))]
    pub authors: Vec<String>,
}

impl NewBook {
    /// Trimmed, deduplicated copy, or the first rule it breaks.
    pub fn normalized(&self) -> AppResult<NewBook> {
        Ok(NewBook {
            title: validate_title(&self.title)?,
            genre: self.genre,
            published_year: validate_published_year(self.published_year)?,
            authors: normalize_author_names(&self.authors)?,
        })
    }
}

/// Partial update. Absent fields are left untouched.
///
/// `authors` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(None)`), which clears every author link.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<Genre>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Vec<String>>)]
    pub authors: Option<Option<Vec<String>>>,
}

impl BookPatch {
    pub fn normalized(&self) -> AppResult<BookPatch> {
        let authors = match &self.authors {
            Some(Some(names)) => Some(Some(normalize_author_names(names)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(BookPatch {
            title: self.title.as_deref().map(validate_title).transpose()?,
            genre: self.genre,
            published_year: self.published_year.map(validate_published_year).transpose()?,
            authors,
        })
    }

    pub fn touches_book_row(&self) -> bool {
        self.title.is_some() || self.genre.is_some() || self.published_year.is_some()
    }
}

/// Returns the trimmed title, rejecting blank ones.
pub fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Invalid title: must not be blank".to_string()));
    }
    Ok(title.to_string())
}

pub fn validate_published_year(year: i32) -> AppResult<i32> {
    let max = current_year();
    if !(MIN_PUBLISHED_YEAR..=max).contains(&year) {
        return Err(AppError::Validation(format!(
            "Invalid published_year {}: must be between {} and {}",
            year, MIN_PUBLISHED_YEAR, max
        )));
    }
    Ok(year)
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Whitelisted sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Title,
    PublishedYear,
}

impl SortField {
    /// Unknown values fall back to `title`.
    pub fn from_param(value: &str) -> Self {
        match value {
            "published_year" => SortField::PublishedYear,
            _ => SortField::Title,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "b.title",
            SortField::PublishedYear => "b.published_year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Unknown values fall back to `asc`.
    pub fn from_param(value: &str) -> Self {
        match value {
            "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter dimensions for listing; all optional and AND-combined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Genre>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

/// List query parameters
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive title substring
    pub title: Option<String>,
    /// Case-insensitive author name substring
    pub author: Option<String>,
    pub genre: Option<Genre>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    /// `title` (default) or `published_year`
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub order: Option<String>,
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl BookQuery {
    /// Blank text filters are treated as absent.
    pub fn filter(&self) -> BookFilter {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        BookFilter {
            title: text(&self.title),
            author: text(&self.author),
            genre: self.genre,
            year_from: self.year_from,
            year_to: self.year_to,
        }
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_by.as_deref().map(SortField::from_param).unwrap_or_default()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order.as_deref().map(SortOrder::from_param).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_boundaries() {
        assert!(matches!(validate_published_year(1799), Err(AppError::Validation(_))));
        assert_eq!(validate_published_year(1800).unwrap(), 1800);
        assert_eq!(validate_published_year(current_year()).unwrap(), current_year());
        assert!(validate_published_year(current_year() + 1).is_err());
    }

    #[test]
    fn test_title_is_trimmed_and_not_blank() {
        assert_eq!(validate_title("  Dune ").unwrap(), "Dune");
        assert!(validate_title("   ").is_err());
        assert!(validate_title("").is_err());
    }

    #[test]
    fn test_genre_parsing() {
        assert_eq!("Non-Fiction".parse::<Genre>().unwrap(), Genre::NonFiction);
        assert!("fiction".parse::<Genre>().is_err());
        assert_eq!(Genre::parse_loose(" fiction "), Some(Genre::Fiction));
        assert_eq!(Genre::parse_loose("non-fiction"), Some(Genre::NonFiction));
        assert_eq!(Genre::parse_loose("Poetry"), None);

        let json = serde_json::to_string(&Genre::NonFiction).unwrap();
        assert_eq!(json, "\"Non-Fiction\"");
    }

    #[test]
    fn test_sort_params_fall_back() {
        assert_eq!(SortField::from_param("published_year"), SortField::PublishedYear);
        assert_eq!(SortField::from_param("id; DROP TABLE books"), SortField::Title);
        assert_eq!(SortOrder::from_param("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::from_param("DESC"), SortOrder::Asc);
        assert_eq!(SortOrder::from_param("sideways"), SortOrder::Asc);
    }

    #[test]
    fn test_new_book_normalization() {
        let book = NewBook {
            title: " Dune ".into(),
            genre: Genre::Fiction,
            published_year: 1965,
            authors: vec!["Frank Herbert".into(), " Frank Herbert ".into()],
        };
        let normalized = book.normalized().unwrap();
        assert_eq!(normalized.title, "Dune");
        assert_eq!(normalized.authors, vec!["Frank Herbert".to_string()]);

        let blank_author = NewBook { authors: vec!["  ".into()], ..book };
        assert!(matches!(blank_author.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_patch_distinguishes_null_authors_from_absent() {
        let absent: BookPatch = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(absent.authors, None);
        assert!(absent.touches_book_row());

        let cleared: BookPatch = serde_json::from_str(r#"{"authors": null}"#).unwrap();
        assert_eq!(cleared.authors, Some(None));
        assert!(!cleared.touches_book_row());

        let replaced: BookPatch = serde_json::from_str(r#"{"authors": ["B", "C"]}"#).unwrap();
        assert_eq!(replaced.authors, Some(Some(vec!["B".to_string(), "C".to_string()])));
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        assert!(serde_json::from_str::<BookPatch>(r#"{"titel": "typo"}"#).is_err());
    }

    #[test]
    fn test_query_blank_filters_are_absent() {
        let query = BookQuery {
            title: Some("  ".into()),
            author: Some(" herbert ".into()),
            ..Default::default()
        };
        let filter = query.filter();
        assert_eq!(filter.title, None);
        assert_eq!(filter.author.as_deref(), Some("herbert"));
        assert_eq!(query.sort_field(), SortField::Title);
        assert_eq!(query.sort_order(), SortOrder::Asc);
    }
}
