//! # Domain Types
//!
//! Resource types the storefront API returns and accepts.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Resource Types                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Category     │   │    Article      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id             │   │  id             │       │
//! │  │  title          │   │  name           │   │  title          │       │
//! │  │  price (Rp)     │   │  image          │   │  content (HTML) │       │
//! │  │  stock          │   └─────────────────┘   │  published      │       │
//! │  └───────┬─────────┘                         └─────────────────┘       │
//! │          │                                                              │
//! │  ┌───────▼─────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Review      │   │  WishlistItem   │   │   HeroImage     │       │
//! │  │  rating 1..=5   │   │  id, product    │   │  id, imageUrl   │       │
//! │  │  comment        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire names are camelCase. Identifiers may arrive as JSON numbers or
//! strings, so they are carried as [`ResourceId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::price::Price;

// =============================================================================
// Resource Identifier
// =============================================================================

/// Identifier of a remote resource.
///
/// The API is not consistent about numeric vs string ids; both decode into
/// the same value and the id is always rendered as text in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates an id from anything printable.
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    /// Returns the id as it appears in a URL path segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => ResourceId(n.to_string()),
            RawId::Text(s) => ResourceId(s),
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId(id)
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        ResourceId(id.to_string())
    }
}

// =============================================================================
// Role
// =============================================================================

/// Authorization role carried in the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Regular shopper.
    #[default]
    User,
    /// Admin console access.
    Admin,
}

impl Role {
    /// Returns true for the admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Landing route after login for this role.
    pub fn landing_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::User => "/user",
        }
    }

    /// Returns true when this role satisfies `required`.
    ///
    /// Admins can do everything a user can.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self.is_admin(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// User Profile
// =============================================================================

/// Profile returned by `GET /api/users/profile` and `GET /api/admin/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: ResourceId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub profile_picture: Option<String>,

    /// Some deployments echo the role here; the token claim wins.
    #[serde(default)]
    pub role: Option<Role>,
}

// =============================================================================
// Catalogue
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Minimal product reference embedded in reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: ResourceId,
    #[serde(default)]
    pub title: Option<String>,
}

/// Review author as embedded by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ResourceId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub product_id: Option<ResourceId>,
    #[serde(default)]
    pub user: Option<ReviewAuthor>,
    #[serde(default)]
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ResourceId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    /// One or more comma-separated image paths.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<ResourceId>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns true when at least one unit is in stock.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Splits the `image` field into individual, slash-prefixed paths.
    pub fn image_paths(&self) -> Vec<String> {
        self.image
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(asset_path)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Category id, whether embedded or given as a foreign key.
    pub fn effective_category_id(&self) -> Option<&ResourceId> {
        self.category
            .as_ref()
            .map(|c| &c.id)
            .or(self.category_id.as_ref())
    }
}

/// Normalizes an asset path so it can be appended to the API base URL.
pub fn asset_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Mean rating of a set of reviews, `None` when there are none.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    Some(f64::from(sum) / reviews.len() as f64)
}

// =============================================================================
// Content
// =============================================================================

/// An editorial article. `content` is rich-text HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ResourceId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A hero banner image on the home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroImage {
    pub id: ResourceId,
    pub image_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HeroImage {
    /// The most recently created banner, which the home page shows.
    pub fn newest(images: &[HeroImage]) -> Option<&HeroImage> {
        images.iter().max_by_key(|img| img.created_at)
    }
}

// =============================================================================
// Account
// =============================================================================

/// An entry in the shopper's wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: ResourceId,
    pub product: Product,
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub product_count: u64,
    #[serde(default)]
    pub review_count: u64,
}

/// API health as reported by `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
}

impl ServerStatus {
    /// Interprets the `status` field of the health-check body.
    pub fn from_report(status: &str) -> Self {
        if status.eq_ignore_ascii_case("online") {
            ServerStatus::Online
        } else {
            ServerStatus::Offline
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Online => write!(f, "online"),
            ServerStatus::Offline => write!(f, "offline"),
        }
    }
}

// =============================================================================
// Write Payloads
// =============================================================================

/// A file part for multipart uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// Fields for creating or updating a product (sent as multipart).
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category_id: ResourceId,
    pub stock: i64,
    pub image: Option<Upload>,
}

/// Fields for creating or updating a category (sent as multipart).
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub image: Option<Upload>,
}

/// Fields for creating or updating an article (sent as multipart).
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author: String,
    pub published: bool,
    pub featured_image: Option<Upload>,
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
    pub product_id: ResourceId,
}

/// Body of `PUT /api/reviews/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub rating: u8,
    pub comment: String,
}

/// Body of `PUT /api/users/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub address: String,
}

/// Body of `POST /api/auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Body of `POST /api/auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
