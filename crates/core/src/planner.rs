//! Filter and pagination planning.
//!
//! A [`FilterPlan`] turns the optional request filters into a list of SQL
//! predicates with their bound values. The same plan drives both the total
//! count and the page of ids, so the two can never disagree on which entries
//! match.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::collation::SQL_COLLATION;
use crate::error::Result;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 500;

const DOMAIN_PREDICATE: &str = "EXISTS (
        SELECT 1
        FROM glossary_domain gd
        JOIN category_dim_domain dd ON dd.id = gd.domain_id
        WHERE gd.glossary_id = g.id AND dd.name = ?
    )";

const KIND_PREDICATE: &str = "EXISTS (
        SELECT 1
        FROM glossary_kind gk
        JOIN category_dim_kind dk ON dk.id = gk.kind_id
        WHERE gk.glossary_id = g.id AND dk.name = ?
    )";

const TERM_PREDICATE: &str = "g.term LIKE ? ESCAPE '\\'";

const COURSE_PREDICATE: &str = "EXISTS (
        SELECT 1
        FROM glossary_course gc
        JOIN course c ON c.id = gc.course_id
        WHERE gc.glossary_id = g.id AND c.title = ?
    )";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryFilter {
    pub domain: Option<String>,
    pub kind: Option<String>,
    pub term_substring: Option<String>,
    pub course_title: Option<String>,
}

impl GlossaryFilter {
    pub fn is_empty(&self) -> bool {
        [
            &self.domain,
            &self.kind,
            &self.term_substring,
            &self.course_title,
        ]
        .iter()
        .all(|value| present(value).is_none())
    }
}

/// A clamped page/limit pair. Out-of-range input is pulled into range, never
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1) as u64,
            limit: limit.clamp(1, MAX_LIMIT as i64) as u32,
        }
    }

    /// Builds pagination from raw query-string values. Unparseable values
    /// fall back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(parse_leading_int)
            .unwrap_or(DEFAULT_PAGE as i64);
        let limit = limit
            .and_then(parse_leading_int)
            .unwrap_or(DEFAULT_LIMIT as i64);
        Self::new(page, limit)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit as u64)
    }
}

/// Parses an optionally signed integer prefix, ignoring surrounding
/// whitespace and anything after the digits ("12abc" is 12).
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let magnitude = rest[..digits_end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Debug, Clone, Default)]
pub struct FilterPlan {
    predicates: Vec<&'static str>,
    params: Vec<SqlValue>,
}

impl FilterPlan {
    pub fn new(filter: &GlossaryFilter) -> Self {
        let mut plan = Self::default();
        if let Some(domain) = present(&filter.domain) {
            plan.push(DOMAIN_PREDICATE, domain.to_string());
        }
        if let Some(kind) = present(&filter.kind) {
            plan.push(KIND_PREDICATE, kind.to_string());
        }
        if let Some(q) = present(&filter.term_substring) {
            plan.push(TERM_PREDICATE, format!("%{}%", escape_like(q)));
        }
        if let Some(course) = present(&filter.course_title) {
            plan.push(COURSE_PREDICATE, course.to_string());
        }
        plan
    }

    fn push(&mut self, predicate: &'static str, value: String) {
        self.predicates.push(predicate);
        self.params.push(SqlValue::Text(value));
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.predicates.join("\n      AND "))
        }
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM glossary g {}", self.where_clause())
    }

    /// Id page ordered by term under the registered collation, with the id
    /// breaking ties so that equal terms cannot shift between pages. The
    /// connection must have a [`Collation`](crate::Collation) registered.
    pub fn page_sql(&self) -> String {
        format!(
            "SELECT g.id FROM glossary g {} ORDER BY g.term COLLATE {SQL_COLLATION}, g.id LIMIT ? OFFSET ?",
            self.where_clause()
        )
    }

    pub fn count(&self, conn: &Connection) -> Result<u64> {
        let total: i64 = conn.query_row(
            &self.count_sql(),
            params_from_iter(self.params.iter()),
            |row| row.get(0),
        )?;
        debug!(total, filters = self.predicates.len(), "counted glossary entries");
        Ok(total.max(0) as u64)
    }

    pub fn page_ids(&self, conn: &Connection, pagination: &Pagination) -> Result<Vec<i64>> {
        let mut bound = self.params.clone();
        bound.push(SqlValue::Integer(pagination.limit() as i64));
        bound.push(SqlValue::Integer(
            pagination.offset().min(i64::MAX as u64) as i64,
        ));
        let mut stmt = conn.prepare(&self.page_sql())?;
        let ids = stmt
            .query_map(params_from_iter(bound.iter()), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(
            page = pagination.page(),
            limit = pagination.limit(),
            ids = ids.len(),
            "selected glossary id page"
        );
        Ok(ids)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(Pagination::new(1, 0).limit(), 1);
        assert_eq!(Pagination::new(1, -20).limit(), 1);
        assert_eq!(Pagination::new(1, 10_000).limit(), MAX_LIMIT);
        assert_eq!(Pagination::new(0, 10).page(), 1);
        assert_eq!(Pagination::new(-3, 10).page(), 1);
    }

    #[test]
    fn query_values_parse_leniently() {
        let p = Pagination::from_query(Some("3"), Some("25abc"));
        assert_eq!((p.page(), p.limit()), (3, 25));
        let p = Pagination::from_query(Some("abc"), None);
        assert_eq!(p, Pagination::default());
        let p = Pagination::from_query(Some(" -2"), Some("0"));
        assert_eq!((p.page(), p.limit()), (1, 1));
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("+7x"), Some(7));
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("99999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(Pagination::new(1, 50).offset(), 0);
        assert_eq!(Pagination::new(4, 50).offset(), 150);
        assert!(Pagination::new(i64::MAX, 500).offset() > 0);
    }

    #[test]
    fn empty_filter_has_no_where_clause() {
        let plan = FilterPlan::new(&GlossaryFilter::default());
        assert_eq!(plan.count_sql(), "SELECT COUNT(*) FROM glossary g ");
        assert!(plan.params().is_empty());
    }

    #[test]
    fn empty_strings_impose_no_constraint() {
        let filter = GlossaryFilter {
            domain: Some(String::new()),
            ..Default::default()
        };
        assert!(filter.is_empty());
        assert!(FilterPlan::new(&filter).params().is_empty());
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let filter = GlossaryFilter {
            domain: Some("React' OR 1=1 --".to_string()),
            kind: Some("Library".to_string()),
            term_substring: Some("50%_off".to_string()),
            course_title: Some("Backend".to_string()),
        };
        let plan = FilterPlan::new(&filter);
        let sql = plan.page_sql();
        assert!(!sql.contains("OR 1=1"));
        assert!(sql.contains("ORDER BY g.term COLLATE glossary, g.id"));
        assert_eq!(sql.matches('?').count(), 6);
        assert_eq!(
            plan.params(),
            &[
                SqlValue::Text("React' OR 1=1 --".to_string()),
                SqlValue::Text("Library".to_string()),
                SqlValue::Text("%50\\%\\_off%".to_string()),
                SqlValue::Text("Backend".to_string()),
            ]
        );
    }
}
