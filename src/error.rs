//! Error types for filevault.

use thiserror::Error;

use crate::auth::PasswordError;
use crate::worker::JobError;

/// Common error type for filevault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid credentials or token.
    #[error("unauthorized")]
    Unauthorized,

    /// Client input rejected.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Background job error.
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Password hashing failure.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Whether this error is caused by the server rather than the client.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            VaultError::Database(_)
                | VaultError::Io(_)
                | VaultError::Job(_)
                | VaultError::Password(_)
                | VaultError::Image(_)
                | VaultError::Config(_)
        )
    }
}

/// Input validation failures.
///
/// The display strings are part of the HTTP contract and are returned
/// verbatim in error bodies.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing name")]
    MissingName,
    #[error("Missing type")]
    InvalidType,
    #[error("Missing data")]
    MissingData,
    #[error("Invalid data")]
    InvalidData,
    #[error("File too large")]
    TooLarge,
    #[error("Parent not found")]
    ParentNotFound,
    #[error("Parent is not a folder")]
    ParentNotFolder,
    #[error("A folder doesn't have content")]
    IsFolder,
    #[error("Missing email")]
    MissingEmail,
    #[error("Missing password")]
    MissingPassword,
    #[error("Password too long")]
    PasswordTooLong,
    #[error("Already exist")]
    AlreadyExists,
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

impl From<image::ImageError> for VaultError {
    fn from(e: image::ImageError) -> Self {
        VaultError::Image(e.to_string())
    }
}

/// Result type alias for filevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
