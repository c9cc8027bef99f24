//! # Price Module
//!
//! Provides the `Price` type for catalogue prices.
//!
//! ## Whole Rupiah
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The storefront prices in Indonesian rupiah, which has no minor unit   │
//! │  in everyday use. The API sends integers, so we keep integers:          │
//! │                                                                         │
//! │    API JSON:  "price": 1250000                                         │
//! │    Price:     Price(1_250_000)                                         │
//! │    Display:   "Rp 1.250.000"   (dot thousands separator)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::price::Price;
//!
//! let price = Price::from_rupiah(15_000);
//! assert_eq!(price.to_string(), "Rp 15.000");
//! assert_eq!(price.rupiah(), 15_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Price Type
// =============================================================================

/// A catalogue price in whole rupiah.
///
/// Serializes as a bare integer so it matches the API's `price` field.
/// Deserialization also accepts decimals and numeric strings, which some
/// endpoints (wishlist, multipart echoes) return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RawPrice::deserialize(deserializer)? {
            RawPrice::Int(v) => Ok(Price(v)),
            RawPrice::Float(v) => Ok(Price(v.round() as i64)),
            RawPrice::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(|v| Price(v.round() as i64))
                .map_err(|_| serde::de::Error::custom(format!("invalid price: {s}"))),
        }
    }
}

impl Price {
    /// Creates a price from whole rupiah.
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Self {
        Price(rupiah)
    }

    /// Returns the amount in whole rupiah.
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0
    }

    /// Zero price.
    #[inline]
    pub const fn zero() -> Self {
        Price(0)
    }

    /// Checks if the price is negative (never valid for a product).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Formats the amount with `.` as thousands separator, without prefix.
    pub fn grouped(&self) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if self.0 < 0 {
            out.push('-');
        }
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    }
}

/// Display shows the price the way product cards do.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp {}", self.grouped())
    }
}

impl Default for Price {
    fn default() -> Self {
        Price::zero()
    }
}

impl From<i64> for Price {
    fn from(rupiah: i64) -> Self {
        Price(rupiah)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
