//! # Resource Endpoint Groups
//!
//! One borrowed handle per REST resource, obtained from the client.
//!
//! ## Endpoint Group Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  client.products().list(&query)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Products<'a> { client: &'a ApiClient }                                │
//! │  ├── list(&self, query)         GET    /api/products?search=..         │
//! │  ├── get(&self, id)             GET    /api/products/{id}              │
//! │  ├── create(&self, product)     POST   /api/products   (multipart)     │
//! │  └── delete(&self, id)          DELETE /api/products/{id}              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiClient::execute → ApiError on any non-2xx                          │
//! │                                                                         │
//! │  Writes validate required fields first and return `()`; callers        │
//! │  re-fetch the list afterwards.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Groups
//!
//! - [`Products`] - Catalogue listing, detail, related, admin writes
//! - [`Categories`] - Category browser and admin writes
//! - [`Articles`] - Paged article listing and editor writes
//! - [`HeroImages`] - Home page banners
//! - [`Reviews`] - Product reviews and "my reviews"
//! - [`Wishlist`] - Shopper wishlist
//! - [`Profile`] / [`Admin`] - Account pages and admin dashboard
//! - [`Auth`] - Login, registration, refresh
//!
//! The health check lives directly on the client: `client.status()`.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod hero_images;
pub mod products;
pub mod profile;
pub mod reviews;
mod status;
pub mod wishlist;

pub use articles::Articles;
pub use auth::{Auth, LoginResponse};
pub use categories::Categories;
pub use hero_images::HeroImages;
pub use products::Products;
pub use profile::{Admin, Profile};
pub use reviews::Reviews;
pub use wishlist::Wishlist;

use storefront_core::validation::validate_search_query;
use storefront_core::ListQuery;

use crate::error::ApiResult;

/// Validates the free-text part of a list query and returns the pairs to
/// send.
pub(crate) fn query_pairs(query: &ListQuery) -> ApiResult<Vec<(&'static str, String)>> {
    if let Some(ref search) = query.search {
        validate_search_query(search)?;
    }
    Ok(query.to_query_pairs())
}
