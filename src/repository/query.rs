//! Dynamic list query composition.
//!
//! Data values are always pushed as bind parameters. Only identifiers taken
//! from [`SortField`] / [`SortOrder`] are written into the SQL text.

use sqlx::{Postgres, QueryBuilder};

use crate::models::book::{BookFilter, SortField, SortOrder};

const SELECT_BOOKS: &str =
    "SELECT b.id, b.title, b.genre, b.published_year FROM books b WHERE 1=1";

/// Compose the list query. `limit` and `offset` are bound as given.
pub fn build_list_query(
    filter: &BookFilter,
    sort_by: SortField,
    order: SortOrder,
    limit: i64,
    offset: i64,
) -> QueryBuilder<'static, Postgres> {
    ListQueryBuilder {
        qb: QueryBuilder::new(SELECT_BOOKS),
        filter,
    }
    .build(sort_by, order, limit, offset)
}

/// `%term%` with LIKE metacharacters escaped, so the match is a literal substring.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

struct ListQueryBuilder<'f> {
    qb: QueryBuilder<'static, Postgres>,
    filter: &'f BookFilter,
}

impl ListQueryBuilder<'_> {
    fn build(
        mut self,
        sort_by: SortField,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> QueryBuilder<'static, Postgres> {
        self.apply_filters();
        self.apply_sort(sort_by, order);
        self.apply_window(limit, offset);
        self.qb
    }

    fn apply_filters(&mut self) {
        if let Some(title) = self.filter.title.as_deref() {
            self.qb.push(" AND b.title ILIKE ");
            self.qb.push_bind(contains_pattern(title));
        }

        if let Some(genre) = self.filter.genre {
            self.qb.push(" AND b.genre = ");
            self.qb.push_bind(genre.as_str());
        }

        if let Some(year_from) = self.filter.year_from {
            self.qb.push(" AND b.published_year >= ");
            self.qb.push_bind(year_from);
        }

        if let Some(year_to) = self.filter.year_to {
            self.qb.push(" AND b.published_year <= ");
            self.qb.push_bind(year_to);
        }

        // EXISTS rather than a join keeps one row per book when several authors match.
        if let Some(author) = self.filter.author.as_deref() {
            self.qb.push(
                " AND EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id \
                 WHERE ba.book_id = b.id AND a.name ILIKE ",
            );
            self.qb.push_bind(contains_pattern(author));
            self.qb.push(")");
        }
    }

    fn apply_sort(&mut self, sort_by: SortField, order: SortOrder) {
        self.qb.push(" ORDER BY ");
        self.qb.push(sort_by.column());
        self.qb.push(" ");
        self.qb.push(order.keyword());
        // tie-breaker so that pages never overlap
        self.qb.push(", b.id ASC");
    }

    fn apply_window(&mut self, limit: i64, offset: i64) {
        self.qb.push(" LIMIT ");
        self.qb.push_bind(limit);
        self.qb.push(" OFFSET ");
        self.qb.push_bind(offset);
    }
}
