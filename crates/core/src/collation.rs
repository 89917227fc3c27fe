use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::GlossaryError;
use crate::model::GlossaryDocument;

/// Name the active collation is registered under on SQLite connections.
pub const SQL_COLLATION: &str = "glossary";

/// String ordering shared by the store's id window and the final sort of a
/// page of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collation {
    Binary,
    Unicode,
    #[default]
    Swedish,
}

impl Collation {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Binary => a.cmp(b),
            Collation::Unicode => fold_key(a, base_rank)
                .cmp(&fold_key(b, base_rank))
                .then_with(|| a.cmp(b)),
            Collation::Swedish => fold_key(a, swedish_rank)
                .cmp(&fold_key(b, swedish_rank))
                .then_with(|| a.cmp(b)),
        }
    }

    /// Makes `COLLATE glossary` compare with this ordering on `conn`.
    pub fn register(self, conn: &Connection) -> rusqlite::Result<()> {
        conn.create_collation(SQL_COLLATION, move |a: &str, b: &str| self.compare(a, b))
    }

    /// Sorts documents by term; a missing term sorts as "".
    pub fn sort_documents(&self, docs: &mut [GlossaryDocument]) {
        docs.sort_by(|a, b| self.compare(a.term_or_empty(), b.term_or_empty()));
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collation::Binary => "binary",
            Collation::Unicode => "unicode",
            Collation::Swedish => "swedish",
        }
    }
}

impl FromStr for Collation {
    type Err = GlossaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" | "bytes" => Ok(Collation::Binary),
            "unicode" | "root" => Ok(Collation::Unicode),
            "swedish" | "sv" | "sv-se" => Ok(Collation::Swedish),
            other => Err(GlossaryError::UnknownCollation(other.to_string())),
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn fold_key(s: &str, rank: fn(char) -> Option<u32>) -> Vec<u32> {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter_map(rank)
        .collect()
}

fn base_rank(c: char) -> Option<u32> {
    strip_marks(c).map(u32::from)
}

// å, ä, ö are letters of their own placed after z.
fn swedish_rank(c: char) -> Option<u32> {
    const AFTER_Z: u32 = 'z' as u32;
    match c {
        'å' => Some(AFTER_Z + 1),
        'ä' | 'æ' => Some(AFTER_Z + 2),
        'ö' | 'ø' => Some(AFTER_Z + 3),
        _ => base_rank(c),
    }
}

fn strip_marks(c: char) -> Option<char> {
    let mut decomposed = std::iter::once(c).nfd().filter(|d| !is_combining_mark(*d));
    decomposed.next()
}
