//! Error types for the contract gateway

use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors (bad file, missing credential, invalid URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream client construction errors
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// HTTP server errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General errors
    #[error("{0}")]
    General(String),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
