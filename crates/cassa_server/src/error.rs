//! Error types for the Cassa server.

use axum::http::header::ALLOW;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use cassa_core::MediaType;
use serde::Serialize;
use thiserror::Error;

/// A specialized `Result` type for Cassa server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all operations within the Cassa server.
#[derive(Debug, Error)]
pub enum Error {
    /// An error reported by the protocol engine or the store.
    #[error(transparent)]
    Core(#[from] cassa_core::Error),

    /// The request could not be mapped to a protocol call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An unexpected internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The standard JSON response body for an API error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// A human-readable error message.
    pub error: String,
    /// A machine-readable error code string.
    pub code: String,
    /// Optional additional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Error {
    /// Returns the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        use cassa_core::Error as Core;
        match self {
            Error::Core(e) => match e {
                Core::GraphNotExists(_) => StatusCode::NOT_FOUND,
                Core::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Core::ParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                Core::QueryError(_) => StatusCode::BAD_REQUEST,
                Core::GraphMismatch { .. } => StatusCode::CONFLICT,
                Core::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
                Core::InvalidFormat(_) => StatusCode::BAD_REQUEST,
                Core::IllegalArgument(_) => StatusCode::BAD_REQUEST,
                Core::ReadOnly => StatusCode::METHOD_NOT_ALLOWED,
                Core::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                Core::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                Core::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code string for this error.
    pub fn error_code(&self) -> &'static str {
        use cassa_core::Error as Core;
        match self {
            Error::Core(e) => match e {
                Core::GraphNotExists(_) => "GRAPH_NOT_EXISTS",
                Core::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
                Core::ParseError(_) => "PARSE_ERROR",
                Core::QueryError(_) => "QUERY_ERROR",
                Core::GraphMismatch { .. } => "GRAPH_MISMATCH",
                Core::NotAcceptable { .. } => "NOT_ACCEPTABLE",
                Core::InvalidFormat(_) => "INVALID_FORMAT",
                Core::IllegalArgument(_) => "ILLEGAL_ARGUMENT",
                Core::ReadOnly => "READ_ONLY",
                Core::Store(_) => "STORE_ERROR",
                Core::Internal(_) => "INTERNAL_ERROR",
                Core::Io(_) => "IO_ERROR",
            },
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// The media types a client could use instead, for 406 and 415.
    fn details(&self) -> Option<String> {
        let types: &[MediaType] = match self {
            Error::Core(cassa_core::Error::UnsupportedMediaType { acceptable, .. }) => acceptable,
            Error::Core(cassa_core::Error::NotAcceptable { supported }) => supported,
            _ => return None,
        };
        Some(
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        } else {
            tracing::debug!(code = self.error_code(), "{}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
            details: self.details(),
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("worker task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassa_core::media_type::known;

    #[test]
    fn test_status_mapping() {
        use cassa_core::Error as Core;
        let cases = [
            (Core::GraphNotExists("g".into()), 404),
            (Core::unsupported(&MediaType::new("application", "pdf").unwrap(), vec![]), 415),
            (Core::ParseError("x".into()), 422),
            (Core::QueryError("x".into()), 400),
            (
                Core::GraphMismatch {
                    expected: "a".into(),
                    found: "b".into(),
                },
                409,
            ),
            (Core::NotAcceptable { supported: vec![] }, 406),
            (Core::InvalidFormat("x".into()), 400),
            (Core::IllegalArgument("x".into()), 400),
            (Core::ReadOnly, 405),
            (Core::Store("x".into()), 500),
            (Core::Internal("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(Error::from(err).status_code().as_u16(), status);
        }
    }

    #[test]
    fn test_details_list_media_types() {
        let err = Error::from(cassa_core::Error::NotAcceptable {
            supported: vec![known::n_triples(), known::text_plain()],
        });
        assert_eq!(
            err.details().as_deref(),
            Some("application/n-triples, text/plain")
        );
        assert!(Error::InvalidInput("x".into()).details().is_none());
    }

    #[test]
    fn test_read_only_sets_allow() {
        let response = Error::from(cassa_core::Error::ReadOnly).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }
}
