//! Upstream failure classification
//!
//! Once the event stream has started the HTTP status is already committed,
//! so every upstream failure is reported to the caller as a single terminal
//! error event carrying one of a fixed set of messages. Internal details
//! (status bodies, transport errors) only go to the log.

use thiserror::Error;

/// Errors raised while opening or reading the upstream stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Connect or read timeout
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    /// Connection refused or host unreachable
    #[error("Failed to connect to upstream: {0}")]
    Connect(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Other transport-level failure (body read, decode, request build)
    #[error("Network error: {0}")]
    Network(String),

    /// Anything not otherwise classified
    #[error("Unexpected upstream error: {0}")]
    Unexpected(String),
}

impl UpstreamError {
    /// Caller-visible message for this failure
    pub fn user_message(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "Request timeout. Please try again.",
            UpstreamError::Connect(_) => {
                "Unable to connect to AI service. Please try again later."
            }
            UpstreamError::Status(401) => "Authentication failed. Please check API configuration.",
            UpstreamError::Status(429) => "Rate limit exceeded. Please try again later.",
            UpstreamError::Status(status) if *status >= 500 => {
                "AI service is temporarily unavailable. Please try again later."
            }
            UpstreamError::Status(_) => "AI service error. Please try again.",
            UpstreamError::Network(_) => {
                "Network error. Please check your connection and try again."
            }
            UpstreamError::Unexpected(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Status(_) => "status",
            UpstreamError::Network(_) => "network",
            UpstreamError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        // Connect timeouts report both flags; timeout wins.
        if e.is_timeout() {
            UpstreamError::Timeout(e.to_string())
        } else if e.is_connect() {
            UpstreamError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            UpstreamError::Status(status.as_u16())
        } else if e.is_request() || e.is_body() || e.is_decode() || e.is_redirect() {
            UpstreamError::Network(e.to_string())
        } else {
            UpstreamError::Unexpected(e.to_string())
        }
    }
}
