//! Error types for docucollect-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using docucollect-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docucollect-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Validation failure raised before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation needed an authenticated account
    #[error("You must be signed in to do that")]
    NotSignedIn,

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row API rejected the request (policy, constraint, bad filter)
    #[error("Table error [{code}]: {message}")]
    Table { code: String, message: String },

    /// Object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
