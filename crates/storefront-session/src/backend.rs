//! Remote calls the session manager depends on.
//!
//! The manager only talks to the API through [`AuthBackend`], so tests can
//! swap in a scripted backend and the CLI can plug in [`ApiClient`].

use async_trait::async_trait;
use storefront_api::{ApiClient, ApiResult};
use storefront_core::{Credentials, Registration, UserProfile};
use url::Url;

/// Authentication endpoints used by [`crate::SessionManager`].
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Profile of the user `token` belongs to. An authorization error
    /// means the token is not accepted.
    async fn fetch_profile(&self, token: &str) -> ApiResult<UserProfile>;

    /// Exchanges the refresh cookie for a new access token.
    async fn refresh_token(&self) -> ApiResult<String>;

    /// Whether [`AuthBackend::refresh_token`] has anything to send. A
    /// backend that cannot tell answers true.
    fn has_refresh_credential(&self) -> bool {
        true
    }

    /// Exchanges credentials for an access token.
    async fn login(&self, credentials: &Credentials) -> ApiResult<String>;

    async fn register(&self, registration: &Registration) -> ApiResult<()>;

    /// Where the browser goes to start the OAuth flow.
    fn oauth_start_url(&self) -> ApiResult<Url>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn fetch_profile(&self, token: &str) -> ApiResult<UserProfile> {
        self.with_token(token).profile().get().await
    }

    async fn refresh_token(&self) -> ApiResult<String> {
        Ok(self.auth().refresh().await?.access_token)
    }

    fn has_refresh_credential(&self) -> bool {
        self.refresh_cookies().is_some()
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        Ok(self.auth().login(credentials).await?.access_token)
    }

    async fn register(&self, registration: &Registration) -> ApiResult<()> {
        self.auth().register(registration).await
    }

    fn oauth_start_url(&self) -> ApiResult<Url> {
        self.auth().oauth_start_url()
    }
}
