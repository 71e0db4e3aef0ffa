//! Error types for the Cassa protocol engine.
//!
//! Every storage backend reports failures through this one taxonomy so the
//! protocol layer can map each case to a single HTTP status.

use crate::media_type::MediaType;
use thiserror::Error;

/// A specialized `Result` type for protocol engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur in the graph store contract.
#[derive(Debug, Error)]
pub enum Error {
    /// The addressed graph does not exist.
    #[error("graph does not exist: {0}")]
    GraphNotExists(String),

    /// The store cannot consume or produce the requested media type.
    #[error("unsupported media type: {media_type}")]
    UnsupportedMediaType {
        /// The rejected media type.
        media_type: String,
        /// The media types the store accepts instead.
        acceptable: Vec<MediaType>,
    },

    /// A graph payload could not be parsed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A patch document is malformed.
    #[error("query error: {0}")]
    QueryError(String),

    /// A patch document targets a graph other than the addressed one.
    #[error("graph mismatch: expected <{expected}>, patch names <{found}>")]
    GraphMismatch {
        /// The graph addressed by the request.
        expected: String,
        /// The graph named inside the patch.
        found: String,
    },

    /// An opaque failure of the backing engine.
    #[error("store error: {0}")]
    Store(String),

    /// None of the supported media types is acceptable to the client.
    #[error("not acceptable, supported: {}", join(.supported))]
    NotAcceptable {
        /// The media types the graph can be served in.
        supported: Vec<MediaType>,
    },

    /// A media type string is malformed.
    #[error("invalid media type format: {0}")]
    InvalidFormat(String),

    /// A contract precondition was violated by the caller.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The store does not support modifications at all.
    #[error("store is read-only")]
    ReadOnly,

    /// An internal invariant was broken, e.g. a feed writer driven out of order.
    #[error("internal error: {0}")]
    Internal(String),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for malformed patches, including graph mismatches.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::QueryError(_) | Error::GraphMismatch { .. })
    }

    /// Creates an `UnsupportedMediaType` error for `media_type`.
    pub fn unsupported(media_type: &MediaType, acceptable: Vec<MediaType>) -> Self {
        Error::UnsupportedMediaType {
            media_type: media_type.to_string(),
            acceptable,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON serialization failed: {}", err))
    }
}

fn join(types: &[MediaType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
