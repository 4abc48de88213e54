//! Error types for canvascal.

use thiserror::Error;

/// Errors that can occur in canvascal operations.
#[derive(Error, Debug)]
pub enum CanvasCalError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider refused the authorization code or refresh token.
    #[error("Authorization failed: {0}")]
    AuthExchange(String),

    #[error("Stored credential could not be loaded: {0}")]
    CredentialLoad(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid event: {0}")]
    Validation(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for canvascal operations.
pub type CanvasCalResult<T> = Result<T, CanvasCalError>;
