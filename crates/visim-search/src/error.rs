//! Search client error types.

use thiserror::Error;

/// Result type for search service operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Search service errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A locally validated schema is inconsistent.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Vector dimension mismatch between a field and its vectorizer.
    #[error("dimension mismatch: field declares {field}, vectorizer produces {vectorizer}")]
    DimensionMismatch { field: u32, vectorizer: u32 },

    /// A provisioning step ran before its prerequisite existed.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// A named resource does not exist on the service.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The service answered with a non-success status.
    ///
    /// The upstream message is preserved verbatim.
    #[error("service returned {status}: {message}")]
    Service { status: u16, message: String },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(field: u32, vectorizer: u32) -> Self {
        Self::DimensionMismatch { field, vectorizer }
    }

    /// Creates a precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Creates a service error.
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// Returns whether the error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}
