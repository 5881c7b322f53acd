//! Author model and name normalization

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Author as stored; names are unique (exact, case-sensitive match)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

pub fn normalize_author_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Invalid author name: must not be blank".to_string()));
    }
    Ok(name.to_string())
}

/// Trims every name and drops repeats, keeping first-seen order.
pub fn normalize_author_names(names: &[String]) -> AppResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = normalize_author_name(name)?;
        if !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_author_names_dedups_after_trim() {
        let names = vec!["B".to_string(), " A".to_string(), "B ".to_string(), "a".to_string()];
        assert_eq!(normalize_author_names(&names).unwrap(), vec!["B", "A", "a"]);
    }

    #[test]
    fn test_blank_author_rejected() {
        assert!(normalize_author_name(" \t").is_err());
        assert!(normalize_author_names(&["Ok".to_string(), "".to_string()]).is_err());
    }
}
