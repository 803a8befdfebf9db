//! Common error types for LearnSmart

use thiserror::Error;

/// Common result type for LearnSmart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the backend crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness rule violated (duplicate email, duplicate enrollment)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password or token verification failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when a database error is a UNIQUE/PRIMARY KEY constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            Error::Conflict(_) => true,
            _ => false,
        }
    }
}
