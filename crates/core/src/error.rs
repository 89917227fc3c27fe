use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("unknown collation: {0}")]
    UnknownCollation(String),
}

pub type Result<T> = std::result::Result<T, GlossaryError>;
