//! Batched hydration of glossary ids into aggregated JSON documents.
//!
//! Every call issues a single statement whose only result column is a JSON
//! array holding one object per matched entry. Nested course and weblink
//! lists are built by ordered sub-selects and re-parsed with `json()` so they
//! embed as arrays rather than strings.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::error::Result;
use crate::normalize::RawAggregate;

const DOCUMENT_SQL: &str = r#"
SELECT json_group_array(json(doc)) AS data
FROM (
    SELECT json_object(
        'term', g.term,
        'definition', g.definition,
        'domain', (
            SELECT dd.name
            FROM glossary_domain gd
            JOIN category_dim_domain dd ON dd.id = gd.domain_id
            WHERE gd.glossary_id = g.id
            ORDER BY dd.name
            LIMIT 1
        ),
        'kind', (
            SELECT dk.name
            FROM glossary_kind gk
            JOIN category_dim_kind dk ON dk.id = gk.kind_id
            WHERE gk.glossary_id = g.id
            ORDER BY dk.name
            LIMIT 1
        ),
        'courses', json((
            SELECT json_group_array(json(course_obj))
            FROM (
                SELECT json_object(
                    'title', c.title,
                    'short_form', c.short_form,
                    'hve_credits', c.hve_credits,
                    'weblink', w2.path
                ) AS course_obj
                FROM glossary_course gc
                JOIN course c ON c.id = gc.course_id
                LEFT JOIN course_weblink cw ON cw.course_id = c.id
                LEFT JOIN weblink w2 ON w2.id = cw.weblink_id
                WHERE gc.glossary_id = g.id
                ORDER BY c.title, w2.path
            )
        )),
        'weblinks', json((
            SELECT json_group_array(path)
            FROM (
                SELECT w.path AS path
                FROM glossary_weblink gw
                JOIN weblink w ON w.id = gw.weblink_id
                WHERE gw.glossary_id = g.id
                ORDER BY w.path
            )
        ))
    ) AS doc
    FROM glossary g
"#;

fn document_sql(selection: &str) -> String {
    format!("{DOCUMENT_SQL}    {selection}\n)")
}

/// Hydrates the given ids with one query. The caller must not pass an empty
/// slice and must re-sort the resulting documents.
pub fn hydrate(conn: &Connection, ids: &[i64]) -> Result<RawAggregate> {
    debug_assert!(!ids.is_empty(), "hydrate called without ids");
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = document_sql(&format!("WHERE g.id IN ({placeholders}) ORDER BY g.id"));
    let raw = conn.query_row(&sql, params_from_iter(ids.iter()), |row| {
        row.get::<_, SqlValue>(0)
    })?;
    debug!(ids = ids.len(), "hydrated glossary page");
    Ok(raw.into())
}

/// Hydrates the entry whose trimmed term equals `term` (already trimmed by
/// the caller). When several entries share the term the lowest id wins.
pub fn lookup_by_term(conn: &Connection, term: &str) -> Result<RawAggregate> {
    let sql = document_sql("WHERE TRIM(g.term) = ?1 ORDER BY g.id LIMIT 1");
    let raw = conn.query_row(&sql, [term], |row| row.get::<_, SqlValue>(0))?;
    Ok(raw.into())
}
