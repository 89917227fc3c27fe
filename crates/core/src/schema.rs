//! Table layout the glossary queries read from. The service never writes;
//! [`SCHEMA`] exists so fixtures and local databases can be created with the
//! exact shape the queries expect.

use rusqlite::Connection;

use crate::error::Result;

pub const REQUIRED_TABLES: [&str; 10] = [
    "glossary",
    "category_dim_domain",
    "category_dim_kind",
    "glossary_domain",
    "glossary_kind",
    "course",
    "glossary_course",
    "weblink",
    "course_weblink",
    "glossary_weblink",
];

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS glossary (
    id INTEGER PRIMARY KEY,
    term TEXT NOT NULL,
    definition TEXT
);
CREATE TABLE IF NOT EXISTS category_dim_domain (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS category_dim_kind (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS glossary_domain (
    glossary_id INTEGER NOT NULL REFERENCES glossary(id),
    domain_id INTEGER NOT NULL REFERENCES category_dim_domain(id),
    PRIMARY KEY (glossary_id, domain_id)
);
CREATE TABLE IF NOT EXISTS glossary_kind (
    glossary_id INTEGER NOT NULL REFERENCES glossary(id),
    kind_id INTEGER NOT NULL REFERENCES category_dim_kind(id),
    PRIMARY KEY (glossary_id, kind_id)
);
CREATE TABLE IF NOT EXISTS course (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    short_form TEXT,
    hve_credits NUMERIC
);
CREATE TABLE IF NOT EXISTS glossary_course (
    glossary_id INTEGER NOT NULL REFERENCES glossary(id),
    course_id INTEGER NOT NULL REFERENCES course(id),
    PRIMARY KEY (glossary_id, course_id)
);
CREATE TABLE IF NOT EXISTS weblink (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS course_weblink (
    course_id INTEGER NOT NULL REFERENCES course(id),
    weblink_id INTEGER NOT NULL REFERENCES weblink(id),
    PRIMARY KEY (course_id, weblink_id)
);
CREATE TABLE IF NOT EXISTS glossary_weblink (
    glossary_id INTEGER NOT NULL REFERENCES glossary(id),
    weblink_id INTEGER NOT NULL REFERENCES weblink(id),
    PRIMARY KEY (glossary_id, weblink_id)
);
CREATE INDEX IF NOT EXISTS idx_glossary_term ON glossary(term);
"#;

/// Required tables absent from the connected database.
pub fn missing_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
    )?;
    let mut missing = Vec::new();
    for table in REQUIRED_TABLES {
        if !stmt.exists([table])? {
            missing.push(table.to_string());
        }
    }
    Ok(missing)
}

/// Name of the main database: its file stem, or "memory" when unnamed.
pub fn database_name(conn: &Connection) -> Result<String> {
    let file: String = conn.query_row(
        "SELECT file FROM pragma_database_list WHERE name = 'main'",
        [],
        |row| row.get(0),
    )?;
    let name = std::path::Path::new(&file)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("memory");
    Ok(name.to_string())
}
