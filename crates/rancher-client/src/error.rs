//! Rancher client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Rancher API
#[derive(Debug, Error)]
pub enum RancherError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rancher API returned an error
    #[error("Rancher API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, expired, login rejected)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g. malformed id, missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
