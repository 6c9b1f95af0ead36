//! Error types for easel-store

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Image source could not be understood
    #[error("invalid image source: {0}")]
    InvalidSource(String),

    /// Remote image could not be fetched
    #[error("failed to fetch image: {0}")]
    Fetch(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::InvalidSource(_) => "invalid_source",
            Self::Fetch(_) => "fetch_failed",
            Self::Io(_) => "io_error",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<Error> for easel_canvas::Error {
    fn from(err: Error) -> Self {
        easel_canvas::Error::Upstream(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
