//! # Session Error Types
//!
//! Error types for the session lifecycle.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Token       │  │     Authorization       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  MalformedToken │  │  NotAuthenticated       │ │
//! │  │  ConfigLoad...  │  │  TokenExpired   │  │  Forbidden              │ │
//! │  │  InvalidUrl     │  │  MissingRedir.. │  │  Api(401/403)           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Storage      │  │    Lifecycle    │                              │
//! │  │                 │  │                 │                              │
//! │  │  Storage        │  │  Superseded     │                              │
//! │  │                 │  │  RefreshFailed  │                              │
//! │  │                 │  │  NoRefreshCred..│                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_api::ApiError;
use storefront_core::Role;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session error type covering every way a session can fail to exist.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid URL (API base or redirect callback).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Token Errors
    // =========================================================================
    /// The token could not be decoded or lacks an expiry.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token's expiry is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// An OAuth redirect arrived without a `token` parameter.
    #[error("Redirect URL carries no token")]
    MissingRedirectToken,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// No session exists.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The session's role is insufficient.
    #[error("{actual} session cannot perform {required} actions")]
    Forbidden { required: Role, actual: Role },

    // =========================================================================
    // Remote / Storage Errors
    // =========================================================================
    /// The API call behind the operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The refresh endpoint refused to issue a new token.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(ApiError),

    /// Reading or writing the stored token failed.
    #[error("Token storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Lifecycle
    // =========================================================================
    /// A newer login or logout replaced this operation before it finished.
    #[error("Superseded by a newer login or logout")]
    Superseded,

    /// No refresh cookie is held; the current token stays in use until it
    /// expires.
    #[error("No refresh credential available, log in again before the token expires")]
    NoRefreshCredential,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SessionError::MalformedToken(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<url::ParseError> for SessionError {
    fn from(err: url::ParseError) -> Self {
        SessionError::InvalidUrl(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SessionError {
    /// Returns true if the user has to log in (again) to continue.
    ///
    /// ## Authorization Errors
    /// - No session, insufficient role
    /// - Token expired or unreadable
    /// - API answered 401/403
    /// - Refresh refused
    pub fn is_authorization(&self) -> bool {
        match self {
            SessionError::NotAuthenticated
            | SessionError::Forbidden { .. }
            | SessionError::TokenExpired
            | SessionError::MalformedToken(_)
            | SessionError::RefreshFailed(_) => true,
            SessionError::Api(err) => err.is_authorization(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfig(_)
                | SessionError::InvalidUrl(_)
                | SessionError::ConfigLoadFailed(_)
                | SessionError::ConfigSaveFailed(_)
        )
    }
}
