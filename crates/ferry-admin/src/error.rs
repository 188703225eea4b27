//! Error types for the Admin API transport.

use thiserror::Error;

/// Errors that can occur when talking to a store's Admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The connection is unusable (empty URL or token).
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx response from the store.
    #[error("request failed ({status}): {body}")]
    Status { status: u16, body: String },

    /// Rate limited.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },

    /// Top-level `errors` in a GraphQL response.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AdminError {
    /// HTTP status code, if this error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AdminError::Status { status, .. } => Some(*status),
            AdminError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}
