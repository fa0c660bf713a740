//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration to version {version} failed: {error}")]
    MigrationFailed { version: i32, error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
