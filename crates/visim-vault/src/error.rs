//! Internal error types for visim-vault.

use thiserror::Error;

/// Result type alias for visim-vault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for visim-vault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The vault answered with a non-success status.
    #[error("vault returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The secret does not exist in the vault.
    #[error("secret not found: {0}")]
    SecretNotFound(String),
}

impl From<Error> for visim_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    visim_core::Error::timeout()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    visim_core::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::SecretNotFound(name) => visim_core::Error::not_found()
                .with_message(format!("secret not found: {name}")),
            Error::Status { status, message } => visim_core::Error::secret_store()
                .with_message(format!("vault returned {status}: {message}")),
        }
    }
}
