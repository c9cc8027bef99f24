//! # Storefront Configuration
//!
//! Settings for the API connection and the session manager.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_API_URL=https://shop.example.com                        │
//! │     STOREFRONT_REFRESH_MARGIN_SECS=120                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/com.storefront.client/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:5000, 60 s refresh margin                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [api]
//! base_url = "http://localhost:5000"
//! request_timeout_secs = 30
//!
//! [session]
//! refresh_margin_secs = 60
//! auto_refresh = true
//! token_file = "/home/sari/.local/share/storefront/token.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storefront_api::{ClientConfig, DEFAULT_BASE_URL};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SessionError, SessionResult};
use crate::manager::SessionOptions;

/// Largest accepted refresh margin (one day).
const MAX_REFRESH_MARGIN_SECS: u64 = 86_400;

// =============================================================================
// API Settings
// =============================================================================

/// Where the API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Root URL of the storefront API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Session Settings
// =============================================================================

/// Token lifetime handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Refresh this many seconds before the token expires.
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,

    /// Arm the silent refresh timer after each successful validation.
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    /// File backing the durable ("remember me") scope. Defaults to
    /// `token.json` in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

fn default_refresh_margin() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            refresh_margin_secs: default_refresh_margin(),
            auto_refresh: true,
            token_file: None,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl StorefrontConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SessionError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SessionError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.session.refresh_margin_secs > MAX_REFRESH_MARGIN_SECS {
            return Err(SessionError::InvalidConfig(format!(
                "refresh_margin_secs must be at most {}",
                MAX_REFRESH_MARGIN_SECS
            )));
        }

        Ok(())
    }

    /// Applies `STOREFRONT_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("STOREFRONT_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("STOREFRONT_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.request_timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid STOREFRONT_TIMEOUT_SECS"),
            }
        }

        if let Some(margin) = lookup("STOREFRONT_REFRESH_MARGIN_SECS") {
            match margin.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "Overriding refresh margin from environment");
                    self.session.refresh_margin_secs = secs;
                }
                Err(_) => warn!(value = %margin, "Ignoring invalid STOREFRONT_REFRESH_MARGIN_SECS"),
            }
        }

        if let Some(flag) = lookup("STOREFRONT_AUTO_REFRESH") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.session.auto_refresh = true,
                "0" | "false" | "no" | "off" => self.session.auto_refresh = false,
                _ => warn!(value = %flag, "Unknown STOREFRONT_AUTO_REFRESH value"),
            }
        }

        if let Some(path) = lookup("STOREFRONT_TOKEN_FILE") {
            self.session.token_file = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "storefront", "client")
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// HTTP client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api.base_url.clone())
            .timeout(Duration::from_secs(self.api.request_timeout_secs))
    }

    /// Session manager settings.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            refresh_margin: Duration::from_secs(self.session.refresh_margin_secs),
            auto_refresh: self.session.auto_refresh,
        }
    }

    /// File backing the durable token scope, if one can be determined.
    pub fn token_file(&self) -> Option<PathBuf> {
        self.session
            .token_file
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("token.json")))
    }
}
