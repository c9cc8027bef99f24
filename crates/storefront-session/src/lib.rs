//! # storefront-session: Login Session for the Storefront Client
//!
//! Holds the current user derived from a bearer token, confirms it with the
//! API, refreshes it silently before it expires, and keeps several running
//! instances in agreement about who is logged in.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Session Data Flow                               │
//! │                                                                         │
//! │  login(token) / stored token / OAuth redirect                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐   decode    ┌──────────────┐                     │
//! │  │  SessionManager  │────────────►│ TokenClaims  │ exp, role           │
//! │  │  (manager.rs)    │             └──────────────┘                     │
//! │  │                  │   profile   ┌──────────────┐                     │
//! │  │  watch<State>    │────────────►│ AuthBackend  │ ApiClient           │
//! │  │                  │             └──────────────┘                     │
//! │  │                  │   persist   ┌──────────────┐                     │
//! │  │                  │────────────►│ TokenStorage │ durable / tab       │
//! │  │                  │             └──────────────┘                     │
//! │  │                  │   arm       ┌──────────────┐                     │
//! │  │                  │────────────►│ RefreshTimer │ one pending task    │
//! │  │                  │             └──────────────┘                     │
//! │  │                  │   signal    ┌──────────────┐                     │
//! │  │                  │◄───────────►│ SessionBus   │ other instances     │
//! │  └──────────────────┘             └──────────────┘                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - `SessionManager` state machine
//! - [`claims`] - Expiry and role read from the token
//! - [`storage`] - Durable and tab-scoped token storage
//! - [`refresh`] - Single cancellable refresh task
//! - [`bus`] - Cross-instance change signals
//! - [`backend`] - Remote calls the manager depends on
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Session error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storefront_api::ApiClient;
//! use storefront_session::{FileTokenStorage, LocalBus, SessionManager, StorefrontConfig};
//!
//! let config = StorefrontConfig::load_or_default(None);
//! let api = ApiClient::new(config.client_config())?;
//!
//! let manager = SessionManager::new(
//!     Arc::new(api.clone()),
//!     Arc::new(FileTokenStorage::new(config.token_file().unwrap())),
//!     Arc::new(LocalBus::new()),
//!     config.session_options(),
//! );
//!
//! match manager.start().await.session() {
//!     Some(session) => println!("Welcome back, {}", session.profile.name),
//!     None => println!("Please log in: {}", manager.oauth_start_url()?),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod bus;
pub mod claims;
pub mod config;
pub mod error;
pub mod manager;
pub mod refresh;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::AuthBackend;
pub use bus::{InstanceId, LocalBus, SessionBus, SessionSignal, SignalReceiver};
pub use claims::TokenClaims;
pub use config::{ApiSettings, SessionSettings, StorefrontConfig};
pub use error::{SessionError, SessionResult};
pub use manager::{
    CurrentUser, InvalidationReason, Session, SessionManager, SessionOptions, SessionState,
    LOGIN_ROUTE,
};
pub use refresh::RefreshTimer;
pub use storage::{
    FileTokenStorage, MemoryTokenStorage, RefreshCookieFile, StorageScope, TokenStorage,
};
