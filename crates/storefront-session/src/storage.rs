//! # Token Storage
//!
//! Where the bearer token lives between runs.
//!
//! ## Storage Scopes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DURABLE ("remember me")          TAB (default)                        │
//! │  ───────────────────────          ─────────────                        │
//! │  Survives restarts                Lives as long as this instance       │
//! │  Shared by every instance         Private to one instance              │
//! │  JSON file / shared memory        Memory only                          │
//! │                                                                         │
//! │  At most one scope holds a token: writing one scope clears the other.  │
//! │  On startup DURABLE is checked first, then TAB.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::SessionResult;

// =============================================================================
// Scope
// =============================================================================

/// Which storage scope a token is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Survives restarts and is visible to every instance.
    Durable,
    /// Private to this instance.
    #[default]
    Tab,
}

impl StorageScope {
    /// Durable when the user ticked "remember me".
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            StorageScope::Durable
        } else {
            StorageScope::Tab
        }
    }

    /// The other scope.
    pub fn other(self) -> Self {
        match self {
            StorageScope::Durable => StorageScope::Tab,
            StorageScope::Tab => StorageScope::Durable,
        }
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageScope::Durable => write!(f, "durable"),
            StorageScope::Tab => write!(f, "tab"),
        }
    }
}

// =============================================================================
// Storage Trait
// =============================================================================

/// Persistence for the bearer token, one slot per [`StorageScope`].
///
/// Calls are synchronous and short; implementations must not block on the
/// network.
pub trait TokenStorage: Send + Sync + fmt::Debug {
    /// Token in `scope`, if any.
    fn get(&self, scope: StorageScope) -> SessionResult<Option<String>>;

    /// Writes `token` to `scope`, replacing what was there.
    fn set(&self, scope: StorageScope, token: &str) -> SessionResult<()>;

    /// Empties `scope`. Removing an empty scope is not an error.
    fn remove(&self, scope: StorageScope) -> SessionResult<()>;

    /// Empties both scopes.
    fn clear(&self) -> SessionResult<()> {
        self.remove(StorageScope::Durable)?;
        self.remove(StorageScope::Tab)
    }

    /// The token to restore at startup: durable first, then tab.
    fn load(&self) -> SessionResult<Option<(StorageScope, String)>> {
        for scope in [StorageScope::Durable, StorageScope::Tab] {
            if let Some(token) = self.get(scope)? {
                return Ok(Some((scope, token)));
            }
        }
        Ok(None)
    }

    /// Returns true when neither scope holds a token.
    fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.load()?.is_none())
    }
}

type Slot = Arc<Mutex<Option<String>>>;

fn lock(slot: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    // A slot holds a plain string; a poisoned lock still holds a valid value.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-memory storage.
///
/// Clones share both slots. [`MemoryTokenStorage::new_tab`] shares only the
/// durable slot, which is how two instances of the app see each other's
/// "remember me" token but not each other's tab token.
///
/// ## Example
/// ```rust
/// use storefront_session::{MemoryTokenStorage, StorageScope, TokenStorage};
///
/// let first = MemoryTokenStorage::new();
/// let second = first.new_tab();
///
/// first.set(StorageScope::Durable, "t1").unwrap();
/// first.set(StorageScope::Tab, "t2").unwrap();
///
/// assert_eq!(second.get(StorageScope::Durable).unwrap().as_deref(), Some("t1"));
/// assert_eq!(second.get(StorageScope::Tab).unwrap(), None);
/// ```
#[derive(Clone, Default)]
pub struct MemoryTokenStorage {
    durable: Slot,
    tab: Slot,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage for another instance: same durable slot, fresh tab slot.
    pub fn new_tab(&self) -> Self {
        MemoryTokenStorage {
            durable: Arc::clone(&self.durable),
            tab: Slot::default(),
        }
    }

    fn slot(&self, scope: StorageScope) -> &Mutex<Option<String>> {
        match scope {
            StorageScope::Durable => &*self.durable,
            StorageScope::Tab => &*self.tab,
        }
    }
}

impl fmt::Debug for MemoryTokenStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTokenStorage")
            .field("durable", &lock(&self.durable).is_some())
            .field("tab", &lock(&self.tab).is_some())
            .finish()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, scope: StorageScope) -> SessionResult<Option<String>> {
        Ok(lock(self.slot(scope)).clone())
    }

    fn set(&self, scope: StorageScope, token: &str) -> SessionResult<()> {
        *lock(self.slot(scope)) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self, scope: StorageScope) -> SessionResult<()> {
        lock(self.slot(scope)).take();
        Ok(())
    }
}

// =============================================================================
// File Storage
// =============================================================================

/// On-disk shape of the durable token file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenFile {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Durable scope in a JSON file, tab scope in memory.
///
/// ## File Format
/// ```json
/// { "token": "<jwt>", "savedAt": "2024-05-01T10:00:00Z" }
/// ```
///
/// On Unix the file is created with mode `0600`.
#[derive(Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
    tab: Slot,
}

impl FileTokenStorage {
    /// Storage backed by the file at `path`. Nothing is touched until the
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStorage {
            path: path.into(),
            tab: Slot::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_durable(&self) -> SessionResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let file: TokenFile = serde_json::from_str(&contents)?;
        Ok(Some(file.token))
    }

    fn write_durable(&self, token: &str) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = TokenFile {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_vec_pretty(&file)?)?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "Durable token written");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl fmt::Debug for FileTokenStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTokenStorage")
            .field("path", &self.path)
            .field("tab", &lock(&self.tab).is_some())
            .finish()
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, scope: StorageScope) -> SessionResult<Option<String>> {
        match scope {
            StorageScope::Durable => self.read_durable(),
            StorageScope::Tab => Ok(lock(&self.tab).clone()),
        }
    }

    fn set(&self, scope: StorageScope, token: &str) -> SessionResult<()> {
        match scope {
            StorageScope::Durable => self.write_durable(token),
            StorageScope::Tab => {
                *lock(&self.tab) = Some(token.to_string());
                Ok(())
            }
        }
    }

    fn remove(&self, scope: StorageScope) -> SessionResult<()> {
        match scope {
            StorageScope::Durable => match std::fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Durable token removed");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            StorageScope::Tab => {
                lock(&self.tab).take();
                Ok(())
            }
        }
    }
}

// =============================================================================
// Refresh Cookie File
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CookieFile {
    cookies: String,
    saved_at: DateTime<Utc>,
}

/// The refresh cookie kept on disk between runs, so a later process can
/// call the refresh endpoint.
///
/// Holds the `Cookie` header value produced by
/// `ApiClient::refresh_cookies`. Written with the same permissions as the
/// durable token.
#[derive(Debug, Clone)]
pub struct RefreshCookieFile {
    path: PathBuf,
}

impl RefreshCookieFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RefreshCookieFile { path: path.into() }
    }

    /// Cookie file stored beside a token file (`refresh-cookie.json`).
    pub fn beside(token_file: &Path) -> Self {
        Self::new(token_file.with_file_name("refresh-cookie.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> SessionResult<Option<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CookieFile = serde_json::from_str(&contents)?;
        Ok(Some(file.cookies).filter(|cookies| !cookies.trim().is_empty()))
    }

    pub fn save(&self, cookies: &str) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CookieFile {
            cookies: cookies.to_string(),
            saved_at: Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_vec_pretty(&file)?)?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "Refresh cookie written");
        Ok(())
    }

    pub fn clear(&self) -> SessionResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Refresh cookie removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
