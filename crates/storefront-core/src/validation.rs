//! # Validation Module
//!
//! Required-field checks that run before a write request is built.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, simple ranges                           │
//! │  └── Errors shown inline next to the form field                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Remote API                                                   │
//! │  ├── Business rules (price/stock policy, uniqueness)                   │
//! │  └── Errors come back as 400/422 → ApiError::Validation                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_rating, validate_search_query};
//!
//! assert!(validate_rating(5).is_ok());
//! assert_eq!(validate_search_query("  kopi ").unwrap(), "kopi");
//! ```

use crate::error::ValidationError;
use crate::types::{Credentials, NewArticle, NewCategory, NewProduct, NewReview, Registration, ReviewUpdate};
use crate::{MAX_RATING, MAX_SEARCH_LEN, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest product title the admin form accepts.
const MAX_TITLE_LEN: usize = 200;

// =============================================================================
// Field Helpers
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (lists everything)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("search", query, MAX_SEARCH_LEN)?;
    Ok(query.to_string())
}

/// Validates a star rating (1..=5).
pub fn validate_rating(rating: u8) -> ValidationResult<()> {
    if rating == 0 || rating > MAX_RATING {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: i64::from(MAX_RATING),
        });
    }
    Ok(())
}

/// Validates an email address loosely (the API does the real check).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required("email", email)?;
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates the admin product form.
///
/// ## Rules
/// - Title required, at most 200 characters
/// - Price and stock must not be negative
/// - A category must be chosen
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    required("title", &product.title)?;
    max_len("title", &product.title, MAX_TITLE_LEN)?;
    non_negative("price", product.price.rupiah())?;
    non_negative("stock", product.stock)?;
    required("categoryId", product.category_id.as_str())?;
    Ok(())
}

/// Validates the category form.
pub fn validate_new_category(category: &NewCategory) -> ValidationResult<()> {
    required("name", &category.name)
}

/// Validates the article editor.
pub fn validate_new_article(article: &NewArticle) -> ValidationResult<()> {
    required("title", &article.title)?;
    required("content", &article.content)?;
    Ok(())
}

/// Validates a new review.
pub fn validate_new_review(review: &NewReview) -> ValidationResult<()> {
    validate_rating(review.rating)?;
    required("comment", &review.comment)?;
    required("productId", review.product_id.as_str())?;
    Ok(())
}

/// Validates a review edit.
pub fn validate_review_update(update: &ReviewUpdate) -> ValidationResult<()> {
    validate_rating(update.rating)?;
    required("comment", &update.comment)
}

/// Validates login credentials.
pub fn validate_credentials(credentials: &Credentials) -> ValidationResult<()> {
    required("email", &credentials.email)?;
    required("password", &credentials.password)?;
    Ok(())
}

/// Validates the registration form.
///
/// ## Rules
/// - Name required
/// - Email must contain a local part and a domain
/// - Password at least 6 characters
pub fn validate_registration(registration: &Registration) -> ValidationResult<()> {
    required("name", &registration.name)?;
    validate_email(&registration.email)?;
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Price;
    use crate::types::ResourceId;

    fn product() -> NewProduct {
        NewProduct {
            title: "Teh Melati".into(),
            description: String::new(),
            price: Price::from_rupiah(12_000),
            category_id: ResourceId::from("4"),
            stock: 10,
            image: None,
        }
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("").unwrap(), "");
        assert_eq!(validate_search_query("  teh ").unwrap(), "teh");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        assert!(validate_new_product(&product()).is_ok());

        let mut p = product();
        p.title = "   ".into();
        assert_eq!(validate_new_product(&p).unwrap_err().field(), "title");

        let mut p = product();
        p.price = Price::from_rupiah(-1);
        assert_eq!(validate_new_product(&p).unwrap_err().field(), "price");

        let mut p = product();
        p.stock = -3;
        assert_eq!(validate_new_product(&p).unwrap_err().field(), "stock");

        let mut p = product();
        p.category_id = ResourceId::from("");
        assert_eq!(validate_new_product(&p).unwrap_err().field(), "categoryId");
    }

    #[test]
    fn test_validate_new_review() {
        let review = NewReview {
            rating: 4,
            comment: "Enak".into(),
            product_id: ResourceId::from(9),
        };
        assert!(validate_new_review(&review).is_ok());

        let empty = NewReview {
            comment: " ".into(),
            ..review
        };
        assert_eq!(
            validate_new_review(&empty).unwrap_err(),
            ValidationError::Required {
                field: "comment".into()
            }
        );
    }

    #[test]
    fn test_validate_registration() {
        let ok = Registration {
            name: "Sari".into(),
            email: "sari@example.com".into(),
            password: "rahasia1".into(),
        };
        assert!(validate_registration(&ok).is_ok());

        let bad_email = Registration {
            email: "sari.example.com".into(),
            ..ok.clone()
        };
        assert_eq!(validate_registration(&bad_email).unwrap_err().field(), "email");

        let short = Registration {
            password: "123".into(),
            ..ok
        };
        assert!(matches!(
            validate_registration(&short),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
    }

    #[test]
    fn test_validate_credentials() {
        let creds = Credentials {
            email: "a@b.c".into(),
            password: String::new(),
            remember_me: false,
        };
        assert_eq!(validate_credentials(&creds).unwrap_err().field(), "password");
    }
}
