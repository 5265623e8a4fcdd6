//! Error types for tabmark.

use thiserror::Error;

/// Result type alias using tabmark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tabmark operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bookmark not found
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(uuid::Uuid),

    /// Category not found
    #[error("Category not found: {0}")]
    CategoryNotFound(uuid::Uuid),

    /// Capture job not found
    #[error("Capture job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Uniqueness or referential conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Request could not be resolved to a user
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::BookmarkNotFound(_)
                | Error::CategoryNotFound(_)
                | Error::JobNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_bookmark_not_found() {
        let id = Uuid::nil();
        let err = Error::BookmarkNotFound(id);
        assert_eq!(err.to_string(), format!("Bookmark not found: {}", id));
    }

    #[test]
    fn test_error_display_job_not_found() {
        let id = Uuid::new_v4();
        let err = Error::JobNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("category exists".to_string());
        assert_eq!(err.to_string(), "Conflict: category exists");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty url".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty url");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::CategoryNotFound(Uuid::nil()).is_not_found());
        assert!(Error::JobNotFound(Uuid::nil()).is_not_found());
        assert!(!Error::Internal("x".into()).is_not_found());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
