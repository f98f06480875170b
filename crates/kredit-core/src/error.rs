//! Error types for Kredit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Cannot delete 'Other' category")]
    ProtectedCategory,

    /// The user has no "Other" category to move spendings into
    #[error("'Other' category missing for user {0}, cannot safely delete")]
    MissingFallback(i64),

    #[error("No file data provided")]
    EmptyUpload,

    #[error("Invalid month format '{0}'. Use YYYY-MM")]
    BadFilter(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),
}

pub type Result<T> = std::result::Result<T, Error>;
