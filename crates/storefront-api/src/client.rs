//! # API Client
//!
//! Connection settings and the shared HTTP handle every endpoint group uses.
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Request, End to End                              │
//! │                                                                         │
//! │  client.products().get(&id)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  request(GET, "/api/products/7")                                       │
//! │  ├── base_url.join(path)                                               │
//! │  └── Authorization: Bearer <token>   (only if a token is attached)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  execute()                                                             │
//! │  ├── 2xx            → body decoded as JSON                             │
//! │  └── anything else  → ApiError::from_response(status, body)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `reqwest::Client` is reference counted, so cloning an [`ApiClient`]
//! (or attaching a token with [`ApiClient::with_token`]) shares one
//! connection pool and one cookie store. The refresh endpoint depends on
//! that cookie store: the server sets its refresh cookie at login.
//! [`ApiClient::refresh_cookies`] and [`ApiClient::restore_refresh_cookies`]
//! carry that cookie from one process to the next.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::Part;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::types::asset_path;
use storefront_core::{Upload, ValidationError};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::resources::{
    Admin, Articles, Auth, Categories, HeroImages, Products, Profile, Reviews, Wishlist,
};

/// Path the server scopes its refresh cookie to.
const REFRESH_PATH: &str = "/api/auth/refresh-token";

/// Where the API lives when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

// =============================================================================
// Client Configuration
// =============================================================================

/// HTTP client configuration.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use storefront_api::ClientConfig;
///
/// let config = ClientConfig::new("https://shop.example.com")
///     .timeout(Duration::from_secs(10));
/// assert_eq!(config.base_url, "https://shop.example.com");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the storefront API.
    /// Default: http://localhost:5000
    pub base_url: String,

    /// Per-request timeout.
    /// Default: 30 seconds
    pub timeout: Duration,

    /// Value of the User-Agent header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("storefront-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new(DEFAULT_BASE_URL)
    }
}

// =============================================================================
// API Client
// =============================================================================

/// Handle to the storefront REST API.
///
/// ## Usage
/// ```rust,ignore
/// let client = ApiClient::new(ClientConfig::default())?;
///
/// // Public endpoints
/// let page = client.products().list(&ListQuery::new().search("kopi")).await?;
///
/// // Protected endpoints need a token
/// let authed = client.with_token(token);
/// authed.wishlist().add(&product_id).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    cookies: Arc<Jar>,
    token: Option<Arc<str>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authorized", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Creates a client with its own connection pool and cookie store.
    ///
    /// ## Returns
    /// * `Ok(ApiClient)` - Ready to use (no request is made here)
    /// * `Err(ApiError::InvalidUrl)` - `base_url` is not an absolute URL
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let base_url = normalize_base(&config.base_url)?;

        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        debug!(base_url = %base_url, "API client created");

        Ok(ApiClient {
            http,
            base_url,
            cookies,
            token: None,
        })
    }

    /// Returns a handle that sends `Authorization: Bearer <token>`.
    ///
    /// Shares the connection pool and cookie store with `self`.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        let token: String = token.into();
        ApiClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            cookies: Arc::clone(&self.cookies),
            token: Some(Arc::from(token)),
        }
    }

    /// Returns a handle without a bearer token.
    pub fn without_token(&self) -> Self {
        ApiClient {
            token: None,
            ..self.clone()
        }
    }

    /// Returns true when protected calls will carry a bearer token.
    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    /// Cookies the refresh endpoint would receive, as a `Cookie` header
    /// value (`name=value; name2=value2`). `None` until the server has set
    /// one.
    pub fn refresh_cookies(&self) -> Option<String> {
        let url = self.url(REFRESH_PATH).ok()?;
        let header = self.cookies.cookies(&url)?;
        header.to_str().ok().map(str::to_owned)
    }

    /// Loads cookies saved by [`ApiClient::refresh_cookies`] in an earlier
    /// process. Blank input is ignored.
    pub fn restore_refresh_cookies(&self, header: &str) -> ApiResult<()> {
        let url = self.url(REFRESH_PATH)?;
        let mut restored = 0;
        for pair in header.split(';').map(str::trim).filter(|pair| pair.contains('=')) {
            self.cookies.add_cookie_str(&format!("{pair}; Path=/"), &url);
            restored += 1;
        }
        debug!(restored, "Refresh cookies restored");
        Ok(())
    }

    /// Root URL of the API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/api/products`.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Absolute URL for an uploaded asset path as stored by the API.
    ///
    /// ```rust
    /// use storefront_api::{ApiClient, ClientConfig};
    ///
    /// let client = ApiClient::new(ClientConfig::new("http://localhost:5000")).unwrap();
    /// let url = client.asset_url("uploads/kopi.jpg").unwrap();
    /// assert_eq!(url.as_str(), "http://localhost:5000/uploads/kopi.jpg");
    /// ```
    pub fn asset_url(&self, path: &str) -> ApiResult<Url> {
        self.url(&asset_path(path))
    }

    // =========================================================================
    // Endpoint Groups
    // =========================================================================

    /// Product catalogue endpoints.
    pub fn products(&self) -> Products<'_> {
        Products::new(self)
    }

    /// Category endpoints.
    pub fn categories(&self) -> Categories<'_> {
        Categories::new(self)
    }

    /// Article endpoints.
    pub fn articles(&self) -> Articles<'_> {
        Articles::new(self)
    }

    /// Home page banner endpoints.
    pub fn hero_images(&self) -> HeroImages<'_> {
        HeroImages::new(self)
    }

    /// Review endpoints.
    pub fn reviews(&self) -> Reviews<'_> {
        Reviews::new(self)
    }

    /// Wishlist endpoints (protected).
    pub fn wishlist(&self) -> Wishlist<'_> {
        Wishlist::new(self)
    }

    /// Shopper profile endpoints (protected).
    pub fn profile(&self) -> Profile<'_> {
        Profile::new(self)
    }

    /// Admin console endpoints (protected, admin role).
    pub fn admin(&self) -> Admin<'_> {
        Admin::new(self)
    }

    /// Login, registration and token refresh.
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// Starts a request, attaching the bearer token when one is set.
    pub(crate) fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        let builder = self.http.request(method, url);
        Ok(match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    pub(crate) fn get(&self, path: &str) -> ApiResult<RequestBuilder> {
        self.request(Method::GET, path)
    }

    pub(crate) fn post(&self, path: &str) -> ApiResult<RequestBuilder> {
        self.request(Method::POST, path)
    }

    pub(crate) fn put(&self, path: &str) -> ApiResult<RequestBuilder> {
        self.request(Method::PUT, path)
    }

    pub(crate) fn delete(&self, path: &str) -> ApiResult<RequestBuilder> {
        self.request(Method::DELETE, path)
    }

    /// Sends the request and turns any non-2xx status into an [`ApiError`].
    pub(crate) async fn execute(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let request = builder.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await?;
        let status = response.status();

        if status.is_success() {
            debug!(%method, path = %path, status = status.as_u16(), "API request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status, &body);
        warn!(%method, path = %path, status = status.as_u16(), error = %err, "API request failed");
        Err(err)
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.execute(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Sends the request and discards whatever body comes back.
    pub(crate) async fn send_unit(&self, builder: RequestBuilder) -> ApiResult<()> {
        self.execute(builder).await?;
        Ok(())
    }
}

/// Parses the base URL and makes sure it ends with `/` so that joins keep
/// any path prefix (`https://host/shop/` + `api/products`).
fn normalize_base(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(format!("{raw} cannot be used as a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Builds a multipart file part from an [`Upload`].
pub(crate) fn file_part(upload: &Upload) -> ApiResult<Part> {
    Part::bytes(upload.bytes.clone())
        .file_name(upload.file_name.clone())
        .mime_str(&upload.mime)
        .map_err(|e| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "file".to_string(),
                reason: e.to_string(),
            })
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
