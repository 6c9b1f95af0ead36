//! Error types for easel-canvas
//!
//! Every failure an orchestrator operation can hit falls into one of three
//! kinds: the target entity is gone, a collaborator reported a failure, or
//! something unexpected happened (a panicked task, a broken invariant).
//! All of them are turned into a single user-visible message on the canvas.

use thiserror::Error;

use crate::entity::EntityId;

/// Canvas error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Entity not found on the canvas
    #[error("image not found: {0}")]
    EntityNotFound(EntityId),

    /// Saved image not present in the catalog
    #[error("saved image not found: {0}")]
    SavedImageNotFound(EntityId),

    /// Generation or persistence collaborator failed
    #[error("{0}")]
    Upstream(String),

    /// Id generation failed or returned an unusable id
    #[error("could not allocate an image id: {0}")]
    IdGeneration(String),

    /// Id already present on the canvas
    #[error("duplicate image id: {0}")]
    DuplicateId(EntityId),

    /// Invalid input from the caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything not anticipated above
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Create an upstream error
    #[must_use]
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create an unexpected error
    #[must_use]
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Whether the error means the operation target no longer exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound(_) | Self::SavedImageNotFound(_))
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EntityNotFound(_) => "entity_not_found",
            Self::SavedImageNotFound(_) => "saved_image_not_found",
            Self::Upstream(_) => "upstream_error",
            Self::IdGeneration(_) => "id_generation_failed",
            Self::DuplicateId(_) => "duplicate_id",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unexpected(_) => "unexpected_error",
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Unexpected(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::EntityNotFound(EntityId::from("a"));
        assert_eq!(err.code(), "entity_not_found");
        assert!(err.is_not_found());

        let err = Error::upstream("backend down");
        assert_eq!(err.code(), "upstream_error");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_upstream_display_is_verbatim() {
        let err = Error::upstream("Failed to generate image");
        assert_eq!(err.to_string(), "Failed to generate image");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::EntityNotFound(EntityId::from("img-1"));
        assert!(err.to_string().contains("img-1"));
    }
}
