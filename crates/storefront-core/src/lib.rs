//! # storefront-core: Pure Domain Logic for the Storefront Client
//!
//! This crate holds the resource types the storefront API returns, the
//! required-field checks that run before a write is submitted, and the
//! pagination math list views need. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Client Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    storefront-cli / UI shell                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         storefront-session  ──►  storefront-api (reqwest)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   price   │  │ pagination │  │ validation│  │   │
//! │  │   │  Product  │  │   Price   │  │ ListQuery  │  │  required │  │   │
//! │  │   │  Article  │  │  Rp 1.000 │  │   Page<T>  │  │  fields   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Resource types (Product, Article, Review, etc.)
//! - [`price`] - Whole-rupiah price with storefront display formatting
//! - [`pagination`] - List query parameters and page math
//! - [`error`] - Domain error types
//! - [`validation`] - Required-field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::pagination::total_pages;
//! use storefront_core::price::Price;
//!
//! assert_eq!(total_pages(11, 5), 3);
//! assert_eq!(Price::from_rupiah(1_250_000).to_string(), "Rp 1.250.000");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pagination;
pub mod price;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use pagination::{paginate, total_pages, ListQuery, Page, SortOrder};
pub use price::Price;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a review rating (ratings run 1..=5 stars).
pub const MAX_RATING: u8 = 5;

/// Longest search text forwarded to the API.
pub const MAX_SEARCH_LEN: usize = 100;

/// Shortest password the registration endpoint accepts.
pub const MIN_PASSWORD_LEN: usize = 6;
