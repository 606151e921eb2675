//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Each variant carries the access label (the operation that failed) so the
/// API layer can log and project a status without inspecting messages.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found during {access}: {key}")]
    NotFound { access: String, key: String },

    #[error("Access denied during {access}: {reason}")]
    Forbidden { access: String, reason: String },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Store request failed during {access}: {message}")]
    Backend { access: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(access: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            access: access.into(),
            key: key.into(),
        }
    }

    pub fn forbidden(access: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Forbidden {
            access: access.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    pub fn backend(access: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            access: access.into(),
            message: message.into(),
        }
    }

    /// HTTP status the error projects to.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::Forbidden { .. } => 403,
            StoreError::InvalidCursor(_) => 400,
            StoreError::Backend { .. } => 500,
            StoreError::Serialization(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_projection() {
        assert_eq!(StoreError::not_found("read", "abc").status_code(), 404);
        assert_eq!(StoreError::forbidden("claim", "owned").status_code(), 403);
        assert_eq!(StoreError::invalid_cursor("bad").status_code(), 400);
        assert_eq!(StoreError::backend("query", "boom").status_code(), 500);
    }
}
