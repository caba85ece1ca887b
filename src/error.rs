//! Error types for gateway calls, draft storage and the command surface.

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single backend call.
///
/// The `Display` text is what ends up in an entity's `*_error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure or an unreadable response body.
    #[error("Request failed: {message}")]
    Transport { message: String },

    /// The response body was not the JSON shape we expected.
    #[error("Failed to parse response: {message}")]
    Decode { message: String },

    /// The backend answered, but refused or returned no payload.
    #[error("{message}")]
    Rejected { message: String },

    /// The request could not be built (bad URL, bad header value).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Failures of the local draft store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare data directory `{path}`: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize drafts: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),
}
