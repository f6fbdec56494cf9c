use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the catalog and configuration layers.
///
/// Search matching and history never produce errors; everything that talks
/// to the backend or the filesystem reports through this type.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url not allowed: {0}")]
    NotAllowed(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// One failure handed to every caller waiting on the same load
    #[error("{0}")]
    Shared(Arc<PortalError>),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PortalError::Validation(msg.into())
    }

    /// Message suitable for showing to the person who triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(msg) => msg.clone(),
            PortalError::Backend { message, .. } => format!("Operation failed: {message}"),
            PortalError::Shared(inner) => inner.user_message(),
            other => format!("Operation failed: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = PortalError::validation("title is required");
        assert_eq!(err.to_string(), "validation failed: title is required");
        assert_eq!(err.user_message(), "title is required");
    }

    #[test]
    fn test_backend_message() {
        let err = PortalError::Backend {
            status: 404,
            message: "relation does not exist".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 404: relation does not exist");
        assert!(err.user_message().contains("relation does not exist"));
    }

    #[test]
    fn test_shared_error_delegates() {
        let err = PortalError::Shared(Arc::new(PortalError::validation("title is required")));
        assert_eq!(err.to_string(), "validation failed: title is required");
        assert_eq!(err.user_message(), "title is required");
    }
}
