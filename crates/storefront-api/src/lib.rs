//! # storefront-api: REST Client for the Storefront
//!
//! Typed async access to every endpoint the storefront consumes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Client Data Flow                        │
//! │                                                                         │
//! │  CLI command / session manager                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   storefront-api (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   ApiClient   │    │ Endpoint      │    │ LatestRequest│  │   │
//! │  │   │  (client.rs)  │    │ groups        │    │  (latest.rs) │  │   │
//! │  │   │               │    │ (resources/)  │    │              │  │   │
//! │  │   │ reqwest +     │◄───│ Products      │    │ drops stale  │  │   │
//! │  │   │ cookie store  │    │ Articles ...  │    │ responses    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront REST API (remote)                    │   │
//! │  │   http://localhost:5000/api/...                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`client`] - Configuration, HTTP handle, request helpers
//! - [`resources`] - One endpoint group per resource
//! - [`latest`] - Stale-response guard for list views
//! - [`error`] - API error types and categories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_api::{ApiClient, ClientConfig};
//! use storefront_core::ListQuery;
//!
//! let client = ApiClient::new(ClientConfig::new("http://localhost:5000"))?;
//!
//! let page = client.articles().list(&ListQuery::new().page(1, 5)).await?;
//! println!("{} articles over {} pages", page.total_count, page.total_pages(5));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod error;
pub mod latest;
pub mod resources;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{ApiClient, ClientConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use latest::LatestRequest;
pub use resources::LoginResponse;
