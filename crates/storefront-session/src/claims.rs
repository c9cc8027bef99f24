//! # Token Claims
//!
//! Reads the two claims the client cares about out of a bearer token.
//!
//! ## What Is (and Is Not) Checked
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  header.payload.signature                                              │
//! │         │                                                               │
//! │         ├── exp   → when to refresh, whether it is already dead        │
//! │         └── role  → "admin" / "ADMIN" / missing (→ USER)               │
//! │                                                                         │
//! │  The signature is NOT verified: the client has no key, and the API     │
//! │  verifies it on every call anyway. A forged token only gets as far as  │
//! │  the profile fetch, which answers 401.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;
use storefront_core::Role;
use tracing::warn;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    role: Option<String>,
}

/// Claims decoded from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// Expiry as Unix seconds.
    pub exp: i64,
    /// Role, `USER` when the claim is absent.
    pub role: Role,
}

impl TokenClaims {
    /// Decodes the claims of `token` without verifying its signature.
    ///
    /// ## Returns
    /// * `Ok(TokenClaims)` - Token is well formed and has an `exp`
    /// * `Err(SessionError::MalformedToken)` - Anything else
    pub fn decode(token: &str) -> SessionResult<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<RawClaims>(token.trim(), &DecodingKey::from_secret(&[]), &validation)?;
        let exp = data
            .claims
            .exp
            .ok_or_else(|| SessionError::MalformedToken("token has no exp claim".into()))?;

        let role = match data.claims.role {
            None => Role::User,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(role = %raw, "Unknown role claim, treating as USER");
                Role::User
            }),
        };

        Ok(TokenClaims { exp, role })
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns true once `now` is at or past the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Time left until expiry, zero when already expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// How long to wait before refreshing: `exp - now - margin`, or zero
    /// when that is not positive.
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use std::time::Duration;
    /// use storefront_core::Role;
    /// use storefront_session::TokenClaims;
    ///
    /// let now = Utc.timestamp_opt(1_000, 0).unwrap();
    /// let claims = TokenClaims { exp: 1_055, role: Role::User };
    /// assert_eq!(claims.refresh_delay(now, Duration::from_secs(60)), Duration::ZERO);
    /// assert_eq!(claims.refresh_delay(now, Duration::from_secs(15)), Duration::from_secs(40));
    /// ```
    pub fn refresh_delay(&self, now: DateTime<Utc>, margin: Duration) -> Duration {
        self.remaining(now).saturating_sub(margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn mint(claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
    }

    #[test]
    fn test_decodes_exp_and_role() {
        let token = mint(json!({ "exp": 2_000_000_000i64, "role": "admin", "id": 4 }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, 2_000_000_000);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        let token = mint(json!({ "exp": 2_000_000_000i64 }));
        assert_eq!(TokenClaims::decode(&token).unwrap().role, Role::User);

        let token = mint(json!({ "exp": 2_000_000_000i64, "role": "superuser" }));
        assert_eq!(TokenClaims::decode(&token).unwrap().role, Role::User);
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = mint(json!({ "exp": 10 }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert!(claims.is_expired_at(Utc::now()));
        assert_eq!(claims.remaining(Utc::now()), Duration::ZERO);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            TokenClaims::decode("not-a-token"),
            Err(SessionError::MalformedToken(_))
        ));
        assert!(matches!(
            TokenClaims::decode(&mint(json!({ "role": "USER" }))),
            Err(SessionError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_refresh_delay() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let claims = TokenClaims {
            exp: 4_600,
            role: Role::User,
        };
        let margin = Duration::from_secs(60);
        assert_eq!(claims.refresh_delay(now, margin), Duration::from_secs(3_540));
        assert_eq!(claims.remaining(now), Duration::from_secs(3_600));
    }
}
