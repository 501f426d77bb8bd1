//! HTTP error handling for the search routes.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use visim_search::SearchError;

/// A specialized [`Result`] type for HTTP handlers.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// HTTP error kinds, each bound to one status code.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400 Bad Request - Invalid request data.
    BadRequest,
    /// 404 Not Found - Resource not found.
    NotFound,
    /// 409 Conflict - A prerequisite resource is missing.
    PreconditionFailed,
    /// 422 Unprocessable Entity - The payload is consistent but invalid.
    UnprocessableEntity,
    /// 500 Internal Server Error - Unexpected server error.
    #[default]
    InternalServerError,
    /// 502 Bad Gateway - The managed search service rejected the call.
    BadGateway,
    /// 504 Gateway Timeout - The managed search service did not answer.
    GatewayTimeout,
}

impl ErrorKind {
    /// Returns the status code for this kind.
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PreconditionFailed => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Returns the stable machine-readable name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::PreconditionFailed => "precondition_failed",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::InternalServerError => "internal_server_error",
            Self::BadGateway => "bad_gateway",
            Self::GatewayTimeout => "gateway_timeout",
        }
    }

    /// Attaches a message, producing a full [`Error`].
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(self).with_message(message)
    }
}

/// The error type for HTTP handlers.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
}

impl Error {
    /// Creates a new [`Error`] with the specified kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Sets a user-facing message for the error.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<SearchError> for Error {
    fn from(err: SearchError) -> Self {
        let kind = match &err {
            SearchError::Io(_) | SearchError::NotFound(_) => ErrorKind::NotFound,
            SearchError::Precondition(_) => ErrorKind::PreconditionFailed,
            SearchError::Schema(_) | SearchError::DimensionMismatch { .. } => {
                ErrorKind::UnprocessableEntity
            }
            SearchError::Service { .. } => ErrorKind::BadGateway,
            SearchError::Http(_) if err.is_timeout() => ErrorKind::GatewayTimeout,
            SearchError::Http(_) => ErrorKind::BadGateway,
            SearchError::InvalidConfig(_) | SearchError::Serialization(_) => {
                ErrorKind::InternalServerError
            }
        };

        kind.with_message(err.to_string())
    }
}

/// Structured JSON body of an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error name.
    pub error: String,
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let body = ErrorResponse {
            error: self.kind.name().to_owned(),
            status: status.as_u16(),
            message: self.message.map(Cow::into_owned),
        };

        (status, Json(body)).into_response()
    }
}
