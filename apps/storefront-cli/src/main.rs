//! # Storefront CLI
//!
//! Command-line front end for the storefront API.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  parse args ──► tracing ──► StorefrontConfig ──► ApiClient             │
//! │                                  │                   │                  │
//! │                                  ▼                   ▼                  │
//! │  refresh-cookie.json ─► FileTokenStorage ──► SessionManager::start    │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                               run one command           │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                        save refresh cookie, shutdown    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod commands;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use storefront_api::ApiClient;
use storefront_session::{
    FileTokenStorage, LocalBus, RefreshCookieFile, SessionManager, SessionResult, StorageScope,
    StorefrontConfig, TokenStorage,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{AppContext, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration
    let mut config = StorefrontConfig::load_or_default(cli.config.clone());
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
        config.validate()?;
    }
    debug!(api = %config.api.base_url, "Configuration loaded");

    let api = ApiClient::new(config.client_config()).context("failed to build API client")?;
    let token_file = config
        .token_file()
        .context("no data directory for the token file, set STOREFRONT_TOKEN_FILE")?;

    // The refresh cookie from the last run lets this process refresh too
    let cookie_file = RefreshCookieFile::beside(&token_file);
    match cookie_file.load() {
        Ok(Some(cookies)) => api.restore_refresh_cookies(&cookies)?,
        Ok(None) => {}
        Err(err) => warn!(error = %err, "Ignoring unreadable refresh cookie file"),
    }

    // Restore the stored session before running the command
    let storage = FileTokenStorage::new(token_file);
    let session = SessionManager::new(
        Arc::new(api.clone()),
        Arc::new(storage.clone()),
        Arc::new(LocalBus::new()),
        config.session_options(),
    );
    let state = session.start().await;
    debug!(%state, "Session restored");

    let ctx = AppContext {
        config,
        config_path: cli.config,
        api,
        session,
    };
    let result = commands::run(cli.command, &ctx).await;

    ctx.session.shutdown();
    if let Err(err) = save_refresh_cookie(&ctx.api, &storage, &cookie_file) {
        warn!(error = %err, "Failed to update refresh cookie file");
    }
    result
}

/// Keeps the refresh cookie alongside a durable token and drops it once
/// the durable token is gone.
fn save_refresh_cookie(
    api: &ApiClient,
    storage: &FileTokenStorage,
    cookie_file: &RefreshCookieFile,
) -> SessionResult<()> {
    match (storage.get(StorageScope::Durable)?, api.refresh_cookies()) {
        (Some(_), Some(cookies)) => cookie_file.save(&cookies),
        (Some(_), None) => Ok(()),
        (None, _) => cookie_file.clear(),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
