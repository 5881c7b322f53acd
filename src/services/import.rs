//! Raw import record decoding.
//!
//! Import files are loosely typed: years may arrive as strings and authors
//! as one delimited string. Records are turned into validated [`NewBook`]s
//! here before anything reaches the repository.

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::book::{Genre, NewBook},
};

/// Separators accepted inside a single `authors` string
const AUTHOR_DELIMITERS: [char; 2] = [',', ';'];

#[derive(Debug, Clone, Deserialize)]
pub struct RawBookRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub published_year: Option<RawYear>,
    #[serde(default, alias = "author")]
    pub authors: Option<RawAuthors>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawYear {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAuthors {
    List(Vec<String>),
    Delimited(String),
}

impl RawAuthors {
    fn into_names(self) -> Vec<String> {
        match self {
            RawAuthors::List(names) => names,
            RawAuthors::Delimited(joined) => joined
                .split(AUTHOR_DELIMITERS)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl RawBookRecord {
    /// Normalize into a book ready for insertion, or describe the first problem.
    pub fn into_new_book(self) -> Result<NewBook, String> {
        let title = self.title.unwrap_or_default();

        let genre = match self.genre.as_deref().map(str::trim) {
            None | Some("") => return Err("Missing genre".to_string()),
            Some(raw) => Genre::parse_loose(raw).ok_or_else(|| format!("Invalid genre: {}", raw))?,
        };

        let published_year = match self.published_year {
            None => return Err("Missing published_year".to_string()),
            Some(RawYear::Number(n)) => {
                i32::try_from(n).map_err(|_| format!("Invalid published_year: {}", n))?
            }
            Some(RawYear::Text(s)) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("Invalid published_year: {}", s))?,
        };

        let authors = self.authors.map(RawAuthors::into_names).unwrap_or_default();

        NewBook {
            title,
            genre,
            published_year,
            authors,
        }
        .normalized()
        .map_err(|e| match e {
            AppError::Validation(message) => message,
            other => other.to_string(),
        })
    }
}

/// Decode the record at `index` of a batch.
pub fn decode_record(index: usize, value: serde_json::Value) -> AppResult<NewBook> {
    if !value.is_object() {
        return Err(AppError::InvalidRecord {
            index,
            message: "Malformed record: expected a JSON object".to_string(),
        });
    }

    let record: RawBookRecord = serde_json::from_value(value).map_err(|e| AppError::InvalidRecord {
        index,
        message: format!("Malformed record: {}", e),
    })?;

    record
        .into_new_book()
        .map_err(|message| AppError::InvalidRecord { index, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delimited_authors_and_text_year() {
        let book = decode_record(
            0,
            json!({
                "title": " Good Omens ",
                "genre": "fiction",
                "published_year": "1990",
                "authors": "Terry Pratchett; Neil Gaiman, "
            }),
        )
        .unwrap();

        assert_eq!(book.title, "Good Omens");
        assert_eq!(book.genre, Genre::Fiction);
        assert_eq!(book.published_year, 1990);
        assert_eq!(book.authors, vec!["Terry Pratchett", "Neil Gaiman"]);
    }

    #[test]
    fn test_author_list_and_alias() {
        let book = decode_record(
            0,
            json!({
                "title": "Cosmos",
                "genre": "Science",
                "published_year": 1980,
                "author": ["Carl Sagan", "Carl Sagan"]
            }),
        )
        .unwrap();
        assert_eq!(book.authors, vec!["Carl Sagan"]);
    }

    #[test]
    fn test_errors_carry_record_index() {
        let err = decode_record(4, json!({"title": "", "genre": "History", "published_year": 1900}))
            .unwrap_err();
        match err {
            AppError::InvalidRecord { index, message } => {
                assert_eq!(index, 4);
                assert!(message.contains("title"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejected_fields() {
        let cases = [
            json!({"title": "T", "published_year": 1900}),
            json!({"title": "T", "genre": "Poetry", "published_year": 1900}),
            json!({"title": "T", "genre": "History"}),
            json!({"title": "T", "genre": "History", "published_year": "nineteen"}),
            json!({"title": "T", "genre": "History", "published_year": 1799}),
            json!({"title": "T", "genre": "History", "published_year": 1900, "authors": ["ok", " "]}),
            json!(["not", "an", "object"]),
            json!("T; History; 1900"),
        ];

        for (index, value) in cases.into_iter().enumerate() {
            assert!(
                matches!(decode_record(index, value), Err(AppError::InvalidRecord { index: i, .. }) if i == index),
                "case {index} should be rejected"
            );
        }
    }

    #[test]
    fn test_positional_record_rejected() {
        let err = decode_record(2, json!(["Dune", "Fiction", 1965, ["Frank Herbert"]])).unwrap_err();
        match err {
            AppError::InvalidRecord { index, message } => {
                assert_eq!(index, 2);
                assert!(message.contains("JSON object"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
