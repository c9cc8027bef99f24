//! # API Error Types
//!
//! Error types for calls to the storefront REST API.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  reqwest::Error / HTTP status / JSON body                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (this module) ← Adds the server's message and a category     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorCategory ← Decides how the caller reacts                         │
//! │       │                                                                 │
//! │       ├── Validation     → inline, next to the form field              │
//! │       ├── Authorization  → session manager logs out                    │
//! │       ├── Network        → dismissable banner, no retry                │
//! │       ├── NotFound       → empty / not-found state                     │
//! │       └── Server         → dismissable banner                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use reqwest::StatusCode;
use storefront_core::ValidationError;
use thiserror::Error;

/// How a failure should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad input; show next to the offending field.
    Validation,
    /// Expired or invalid token; the session must be dropped.
    Authorization,
    /// Transport failure; show a banner, never retry automatically.
    Network,
    /// Resource does not exist; render the not-found state.
    NotFound,
    /// The server failed or answered with something unreadable.
    Server,
}

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected locally before a request was built.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The server rejected the request body (400 / 422).
    ///
    /// ## When This Occurs
    /// - Duplicate email on registration
    /// - Business rules enforced remotely (price/stock policy)
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The token was missing, expired or lacked the role (401 / 403).
    #[error("Not authorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// The resource does not exist (404).
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The server failed (5xx or any other unexpected status).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection refused, DNS failure, timeout, aborted body.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not the JSON we expected.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Builds an error from a non-success status and its response body.
    ///
    /// ## Message Extraction
    /// ```text
    /// {"error": "Email already used"}   → "Email already used"
    /// {"message": "Token expired"}      → "Token expired"
    /// plain text body                   → the trimmed text
    /// empty body                        → canonical reason ("Not Found")
    /// ```
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
        let code = status.as_u16();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Unauthorized { status: code, message }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Rejected { status: code, message }
            }
            _ => ApiError::Server { status: code, message },
        }
    }

    /// Category used to decide how the failure is presented.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Validation(_) | ApiError::Rejected { .. } | ApiError::InvalidUrl(_) => {
                ErrorCategory::Validation
            }
            ApiError::Unauthorized { .. } => ErrorCategory::Authorization,
            ApiError::NotFound { .. } => ErrorCategory::NotFound,
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::Server { .. } | ApiError::Decode(_) => ErrorCategory::Server,
        }
    }

    /// Returns true when the session holding the token must be dropped.
    pub fn is_authorization(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    /// Returns true for a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. }
            | ApiError::Unauthorized { status, .. }
            | ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Pulls a human-readable message out of an error body.
fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string),
        Err(_) => Some(body.to_string()),
    }
}

/// Convert reqwest errors to ApiError.
///
/// ## Error Mapping
/// ```text
/// decode failure         → ApiError::Decode
/// carries a status       → ApiError::from_response(status, "")
/// builder / bad URL      → ApiError::InvalidUrl
/// anything else          → ApiError::Network
/// ```
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::from_response(status, "")
        } else if err.is_builder() {
            ApiError::InvalidUrl(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
