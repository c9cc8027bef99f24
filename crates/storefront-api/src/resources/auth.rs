//! # Auth Endpoints
//!
//! Credential login, registration, silent refresh, OAuth entry point.
//!
//! ## Token Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/auth/login          {email,password,rememberMe}             │
//! │       ← {"accessToken": "<jwt>"}   + refresh cookie                    │
//! │                                                                         │
//! │  POST /api/auth/refresh-token  (no body, refresh cookie only)          │
//! │       ← {"accessToken": "<jwt>"}                                       │
//! │                                                                         │
//! │  GET  /api/auth/google         browser redirect, ends on a success     │
//! │       page carrying ?token=<jwt>                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these calls touch session state; the session manager decides
//! what to do with the token they return.

use serde::Deserialize;
use std::fmt;
use storefront_core::validation::{validate_credentials, validate_registration};
use storefront_core::{Credentials, Registration};
use tracing::{debug, info};
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Body returned by login and refresh.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Auth endpoints. Obtain via [`ApiClient::auth`].
#[derive(Debug, Clone, Copy)]
pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Auth { client }
    }

    /// Exchanges credentials for an access token.
    ///
    /// ## Returns
    /// * `Ok(LoginResponse)` - Token issued, refresh cookie stored
    /// * `Err(ApiError::Validation)` - Email or password empty
    /// * `Err(ApiError::Unauthorized)` / `Rejected` - Wrong credentials
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        validate_credentials(credentials)?;
        let request = self.client.post("/api/auth/login")?.json(credentials);
        let response: LoginResponse = self.client.send_json(request).await?;
        info!(email = %credentials.email, remember_me = credentials.remember_me, "Login accepted");
        Ok(response)
    }

    /// Creates an account. The shopper logs in separately afterwards.
    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        validate_registration(registration)?;
        let request = self.client.post("/api/auth/register")?.json(registration);
        self.client.send_unit(request).await?;
        info!(email = %registration.email, "Account registered");
        Ok(())
    }

    /// Asks for a fresh access token using the refresh cookie.
    pub async fn refresh(&self) -> ApiResult<LoginResponse> {
        let request = self.client.post("/api/auth/refresh-token")?;
        let response: LoginResponse = self.client.send_json(request).await?;
        debug!("Access token refreshed");
        Ok(response)
    }

    /// Where the browser goes to start a Google sign-in.
    pub fn oauth_start_url(&self) -> ApiResult<Url> {
        self.client.url("/api/auth/google")
    }
}
