//! Error taxonomy for storefront operations.
//!
//! `ApiError` is `Clone` because the query cache hands one fetch result to
//! every caller waiting on the same descriptor.

use reqwest::StatusCode;
use storefront_core::ValidationErrors;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by fetches and mutations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Transport or connectivity failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Message from the error body, or the status reason.
        message: String,
    },

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Form input failed client-side rules; no request was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Operation requires a token and none is stored.
    #[error("Authentication required")]
    Unauthenticated,

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Whether this is a 404 from a detail fetch or mutation.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Whether the backend rejected the caller's credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Http { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
