//! # Pagination
//!
//! List query parameters and page math shared by every list view.
//!
//! ## Two Pagination Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SERVER-SIDE (articles, admin products)                                 │
//! │    GET /api/articles?page=2&limit=5                                    │
//! │    ← { "articles": [...], "totalCount": 11 }                           │
//! │    total_pages(11, 5) = 3                                              │
//! │                                                                         │
//! │  CLIENT-SIDE (catalogue, wishlist, user reviews)                       │
//! │    GET /api/products?search=kopi                                       │
//! │    ← [ ...all matches... ]                                             │
//! │    paginate(&items, page, 15) slices locally                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::price::Price;

// =============================================================================
// Sort Order
// =============================================================================

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

// =============================================================================
// List Query
// =============================================================================

/// Query parameters accepted by list endpoints.
///
/// Only fields that are set end up in the query string.
///
/// ## Example
/// ```rust
/// use storefront_core::pagination::{ListQuery, SortOrder};
///
/// let query = ListQuery::new()
///     .search("kopi")
///     .sort("createdAt", SortOrder::Desc)
///     .page(2, 15);
///
/// let pairs = query.to_query_pairs();
/// assert!(pairs.contains(&("search", "kopi".to_string())));
/// assert!(pairs.contains(&("page", "2".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search text; blank text clears it.
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        self.search = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn price_range(mut self, min: Option<Price>, max: Option<Price>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.order = Some(order);
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page.max(1));
        self.limit = Some(limit.max(1));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    /// Newest first, the default ordering of every storefront list.
    pub fn newest_first(self) -> Self {
        self.sort("createdAt", SortOrder::Desc)
    }

    /// Returns the query string pairs using the API's parameter names.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(ref category) = self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.rupiah().to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.rupiah().to_string()));
        }
        if let Some(ref sort_by) = self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Page Math
// =============================================================================

/// Number of pages needed for `total` items at `page_size` per page.
///
/// A zero page size yields zero pages rather than dividing by zero.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size)) as u32
}

/// Clamps a 1-based page number into `1..=total_pages` (1 when empty).
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

/// Returns the slice of `items` shown on `page` (1-based).
///
/// The page is clamped first, so "next" past the end keeps showing the
/// last page instead of an empty one.
pub fn paginate<T>(items: &[T], page: u32, page_size: u32) -> &[T] {
    if page_size == 0 || items.is_empty() {
        return &[];
    }
    let pages = total_pages(items.len() as u64, page_size);
    let page = clamp_page(page, pages) as usize;
    let size = page_size as usize;
    let start = (page - 1) * size;
    let end = (start + size).min(items.len());
    &items[start..end]
}

// =============================================================================
// Page Envelope
// =============================================================================

/// Keys under which list endpoints nest their items.
const ITEM_KEYS: &[&str] = &["items", "data", "products", "articles", "reviews", "categories"];

/// A page of results.
///
/// Decodes both response shapes the API uses: a bare JSON array, or an
/// object holding the items plus `totalCount`. For bare arrays the total is
/// the array length.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Pages needed at `page_size` for the reported total.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        total_pages(self.total_count, page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Interprets an already-parsed JSON body.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => {
                let items: Vec<T> = serde_json::from_value(value)?;
                let total_count = items.len() as u64;
                Ok(Page { items, total_count })
            }
            Value::Object(mut map) => {
                let key = ITEM_KEYS
                    .iter()
                    .copied()
                    .find(|key| matches!(map.get(*key), Some(Value::Array(_))));
                let raw_items = key
                    .and_then(|key| map.remove(key))
                    .unwrap_or(Value::Array(Vec::new()));
                let items: Vec<T> = serde_json::from_value(raw_items)?;
                let total_count = map
                    .get("totalCount")
                    .or_else(|| map.get("total"))
                    .and_then(Value::as_u64)
                    .unwrap_or(items.len() as u64);
                Ok(Page { items, total_count })
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a list response, got {other}"
            ))),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Page<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Page::from_value(value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
