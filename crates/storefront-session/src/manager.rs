//! # Session Manager
//!
//! Owns the one authoritative login session of a running client.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                    login / redirect / stored token                      │
//! │   ┌─────────────────┐ ───────────────────────────► ┌────────────────┐  │
//! │   │ Unauthenticated │                               │   Validating   │  │
//! │   └─────────────────┘ ◄─────────────────────────── └────────────────┘  │
//! │          ▲              malformed / expired / 401 /         │          │
//! │          │              network failure                     │ profile  │
//! │          │                                                  ▼ fetched  │
//! │          │ logout, refresh failed,          ┌──────────────────────┐   │
//! │          │ cleared elsewhere                │ Authenticated        │   │
//! │          └───────────────────────────────── │  └ RefreshScheduled  │   │
//! │                                             └──────────────────────┘   │
//! │                                                      │ timer fires     │
//! │                                                      ▼                 │
//! │                                       Validating (refresh endpoint)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Epochs
//!
//! Every login, refresh and logout bumps an epoch under the commit lock.
//! A validation only commits its result if the epoch it started in is
//! still current, so a slow profile fetch for an old token can never
//! overwrite a newer login or resurrect a logged-out session. The lock is
//! never held across a network call.

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use storefront_api::{ApiClient, ApiError};
use storefront_core::validation::{validate_credentials, validate_registration};
use storefront_core::{Credentials, Registration, Role, UserProfile};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::AuthBackend;
use crate::bus::{InstanceId, SessionBus, SessionSignal};
use crate::claims::TokenClaims;
use crate::error::{SessionError, SessionResult};
use crate::refresh::RefreshTimer;
use crate::storage::{StorageScope, TokenStorage};

/// Route shown to visitors without a session.
pub const LOGIN_ROUTE: &str = "/login";

// =============================================================================
// Options
// =============================================================================

/// Tuning for the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Refresh this long before the token expires.
    /// Default: 60 seconds
    pub refresh_margin: Duration,

    /// Arm the refresh timer after each successful validation.
    /// Default: true
    pub auto_refresh: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            refresh_margin: Duration::from_secs(60),
            auto_refresh: true,
        }
    }
}

// =============================================================================
// Session Types
// =============================================================================

/// A validated session.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub profile: UserProfile,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    token: String,
}

impl Session {
    /// The bearer token backing this session.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            profile: self.profile.clone(),
            role: self.role,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.profile)
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Profile and role of the logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub profile: UserProfile,
    pub role: Role,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// A token is known but not yet confirmed by the API.
    Validating,
    /// Confirmed, no refresh pending.
    Authenticated(Session),
    /// Confirmed, refresh timer armed.
    RefreshScheduled(Session),
}

impl SessionState {
    pub fn is_validating(&self) -> bool {
        matches!(self, SessionState::Validating)
    }

    /// True for both confirmed states.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SessionState::Unauthenticated)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) | SessionState::RefreshScheduled(session) => {
                Some(session)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Validating => write!(f, "validating"),
            SessionState::Authenticated(_) => write!(f, "authenticated"),
            SessionState::RefreshScheduled(_) => write!(f, "refresh-scheduled"),
        }
    }
}

/// Why the last session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    Logout,
    Expired,
    MalformedToken,
    /// The API answered 401/403.
    Unauthorized,
    NetworkFailure,
    RefreshFailed,
    /// Another instance logged out.
    RemovedElsewhere,
    /// The stored token could not be read.
    StorageUnreadable,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidationReason::Logout => "logout",
            InvalidationReason::Expired => "token expired",
            InvalidationReason::MalformedToken => "malformed token",
            InvalidationReason::Unauthorized => "token rejected by the API",
            InvalidationReason::NetworkFailure => "API unreachable",
            InvalidationReason::RefreshFailed => "refresh failed",
            InvalidationReason::RemovedElsewhere => "logged out in another window",
            InvalidationReason::StorageUnreadable => "stored token unreadable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationOrigin {
    Login,
    Refresh,
    Startup,
    CrossContext,
}

impl ValidationOrigin {
    /// Tokens that came out of a refresh, here or in another instance, are
    /// never refreshed again before their timer fires.
    fn refreshes_inline(self) -> bool {
        matches!(self, ValidationOrigin::Login | ValidationOrigin::Startup)
    }
}

// =============================================================================
// Manager
// =============================================================================

type SessionFuture<'a> = Pin<Box<dyn Future<Output = SessionResult<Session>> + Send + 'a>>;

struct Inner {
    id: InstanceId,
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn TokenStorage>,
    bus: Arc<dyn SessionBus>,
    options: SessionOptions,

    /// Bumped on every begin/invalidate; only written under `commit`.
    epoch: AtomicU64,
    commit: Mutex<()>,
    state_tx: watch::Sender<SessionState>,

    scope: StdMutex<StorageScope>,
    last_invalidation: StdMutex<Option<InvalidationReason>>,
    timer: RefreshTimer,
    listener: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.listener).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to the session manager. Clones share one session.
///
/// ## Usage
/// ```rust,ignore
/// let manager = SessionManager::new(
///     Arc::new(api.clone()),
///     Arc::new(FileTokenStorage::new(path)),
///     Arc::new(LocalBus::new()),
///     SessionOptions::default(),
/// );
/// manager.start().await;
///
/// manager.login_with_credentials(&credentials).await?;
/// let admin_api = manager.authorized(&api, Role::Admin)?;
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state_tx.borrow())
            .field("timer", &self.inner.timer)
            .finish()
    }
}

impl SessionManager {
    /// Creates a manager. The initial state is `Validating` when either
    /// storage scope holds a token, `Unauthenticated` otherwise; call
    /// [`SessionManager::start`] to settle it.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn TokenStorage>,
        bus: Arc<dyn SessionBus>,
        options: SessionOptions,
    ) -> Self {
        let initial = match storage.load() {
            Ok(Some(_)) => SessionState::Validating,
            Ok(None) => SessionState::Unauthenticated,
            Err(err) => {
                warn!(error = %err, "Token storage unreadable");
                SessionState::Validating
            }
        };
        let (state_tx, _) = watch::channel(initial);

        SessionManager {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                backend,
                storage,
                bus,
                options,
                epoch: AtomicU64::new(0),
                commit: Mutex::new(()),
                state_tx,
                scope: StdMutex::new(StorageScope::default()),
                last_invalidation: StdMutex::new(None),
                timer: RefreshTimer::new(),
                listener: StdMutex::new(None),
            }),
        }
    }

    /// Attaches the cross-instance listener and settles the initial state
    /// by validating the stored token, if any.
    pub async fn start(&self) -> SessionState {
        self.attach_listener();

        match self.inner.storage.load() {
            Ok(Some((scope, token))) => {
                info!(%scope, "Restoring stored session");
                match self.begin(None, &token, scope, false).await {
                    Ok(epoch) => {
                        if let Err(err) = self.validate(epoch, token, ValidationOrigin::Startup).await {
                            info!(error = %err, "Stored session not restored");
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to restore stored session"),
                }
            }
            Ok(None) => {
                let _guard = self.inner.commit.lock().await;
                self.inner.state_tx.send_if_modified(|state| {
                    if state.is_validating() {
                        *state = SessionState::Unauthenticated;
                        true
                    } else {
                        false
                    }
                });
            }
            Err(err) => {
                warn!(error = %err, "Discarding unreadable stored token");
                self.invalidate(None, InvalidationReason::StorageUnreadable, false)
                    .await;
            }
        }

        self.state()
    }

    /// Detaches from the bus and cancels the pending refresh.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.inner.listener).take() {
            handle.abort();
        }
        self.inner.timer.cancel();
        debug!(id = %self.inner.id, "Session manager shut down");
    }

    // =========================================================================
    // Login / Logout
    // =========================================================================

    /// Stores `token` in `scope`, tells other instances, and validates it.
    ///
    /// A token that fails validation is treated as a logout: both scopes
    /// are cleared and the state ends `Unauthenticated`.
    pub async fn login(&self, token: &str, scope: StorageScope) -> SessionResult<Session> {
        let token = token.trim();
        info!(%scope, "Logging in");

        let epoch = self.begin(None, token, scope, true).await?;
        self.publish(SessionSignal::TokenChanged {
            origin: self.inner.id,
        });
        self.validate(epoch, token.to_string(), ValidationOrigin::Login)
            .await
    }

    /// Logs in with email and password. "Remember me" selects the durable
    /// scope.
    pub async fn login_with_credentials(&self, credentials: &Credentials) -> SessionResult<Session> {
        validate_credentials(credentials).map_err(ApiError::from)?;
        let token = self.inner.backend.login(credentials).await?;
        self.login(&token, StorageScope::from_remember_me(credentials.remember_me))
            .await
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> SessionResult<()> {
        validate_registration(registration).map_err(ApiError::from)?;
        self.inner.backend.register(registration).await?;
        info!(email = %registration.email, "Account registered");
        Ok(())
    }

    /// Completes an OAuth login from the callback URL, which carries the
    /// token in its `token` query parameter.
    pub async fn login_from_redirect(&self, redirect: &str) -> SessionResult<Session> {
        let url = Url::parse(redirect)?;
        let token = url
            .query_pairs()
            .find(|(key, value)| key == "token" && !value.trim().is_empty())
            .map(|(_, value)| value.into_owned())
            .ok_or(SessionError::MissingRedirectToken)?;

        self.login(&token, StorageScope::Durable).await
    }

    /// Where to send the user to start an OAuth login.
    pub fn oauth_start_url(&self) -> SessionResult<Url> {
        Ok(self.inner.backend.oauth_start_url()?)
    }

    /// Clears both scopes, cancels the refresh timer and ends the session.
    /// Safe to call in any state.
    pub async fn logout(&self) {
        self.invalidate(None, InvalidationReason::Logout, true).await;
    }

    /// Refreshes the current session now instead of waiting for the timer.
    pub async fn refresh_now(&self) -> SessionResult<Session> {
        if !self.state().is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        self.refresh(self.epoch()).await
    }

    /// Re-arms the refresh timer for a session expiring at `expires_at`,
    /// replacing whatever was pending. Returns the delay until it fires.
    pub async fn schedule_refresh(&self, expires_at: DateTime<Utc>) -> SessionResult<Duration> {
        let _guard = self.inner.commit.lock().await;
        let session = self.session().ok_or(SessionError::NotAuthenticated)?;

        let remaining = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let delay = remaining.saturating_sub(self.inner.options.refresh_margin);
        self.arm_refresh(self.epoch(), delay);
        self.inner
            .state_tx
            .send_replace(SessionState::RefreshScheduled(session));

        debug!(refresh_in_secs = delay.as_secs(), "Refresh rescheduled");
        Ok(delay)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state. Never blocks.
    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Waits until the state is no longer `Validating`.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|state| !state.is_validating()).await;
        match settled {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.state().session().cloned()
    }

    /// Profile and role, or `None` without a confirmed session. Never
    /// blocks; a `Validating` session reads as `None`.
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state().session().map(Session::current_user)
    }

    /// Route to show after login: the role's landing page, or the login
    /// page without a session.
    pub fn landing_route(&self) -> &'static str {
        self.current_user()
            .map(|user| user.role.landing_route())
            .unwrap_or(LOGIN_ROUTE)
    }

    /// Returns the bearer token when the session's role satisfies
    /// `required`.
    pub fn authorize(&self, required: Role) -> SessionResult<String> {
        let session = self.session().ok_or(SessionError::NotAuthenticated)?;
        if !session.role.satisfies(required) {
            return Err(SessionError::Forbidden {
                required,
                actual: session.role,
            });
        }
        Ok(session.token)
    }

    /// A copy of `api` carrying the session token, checked against
    /// `required`.
    pub fn authorized(&self, api: &ApiClient, required: Role) -> SessionResult<ApiClient> {
        Ok(api.with_token(self.authorize(required)?))
    }

    /// Ends the session when an API call reports the token is no longer
    /// accepted. Returns true if the session was ended.
    pub async fn handle_api_error(&self, err: &ApiError) -> bool {
        if !err.is_authorization() || self.state().is_unauthenticated() {
            return false;
        }
        warn!(error = %err, "API rejected session token");
        self.invalidate(None, InvalidationReason::Unauthorized, true)
            .await
    }

    pub fn last_invalidation(&self) -> Option<InvalidationReason> {
        *lock(&self.inner.last_invalidation)
    }

    /// Time until the pending refresh fires.
    pub fn refresh_due_in(&self) -> Option<Duration> {
        self.inner.timer.due_in()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn options(&self) -> SessionOptions {
        self.inner.options
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn scope(&self) -> StorageScope {
        *lock(&self.inner.scope)
    }

    fn publish(&self, signal: SessionSignal) {
        self.inner.bus.publish(signal);
    }

    /// Enters `Validating` for `token` and returns the new epoch. With
    /// `persist` the token is written to `scope`; the other scope is
    /// always emptied.
    async fn begin(
        &self,
        expected: Option<u64>,
        token: &str,
        scope: StorageScope,
        persist: bool,
    ) -> SessionResult<u64> {
        let _guard = self.inner.commit.lock().await;
        if expected.is_some_and(|epoch| epoch != self.epoch()) {
            return Err(SessionError::Superseded);
        }

        if persist {
            self.inner.storage.set(scope, token)?;
        }
        self.inner.storage.remove(scope.other())?;

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.timer.cancel();
        *lock(&self.inner.scope) = scope;
        self.inner.state_tx.send_replace(SessionState::Validating);

        debug!(epoch, %scope, "Validating token");
        Ok(epoch)
    }

    /// `Validating → Authenticated | RefreshScheduled | Unauthenticated`.
    async fn validate(
        &self,
        epoch: u64,
        token: String,
        origin: ValidationOrigin,
    ) -> SessionResult<Session> {
        let claims = match TokenClaims::decode(&token) {
            Ok(claims) => claims,
            Err(err) => return self.fail(epoch, InvalidationReason::MalformedToken, err).await,
        };
        if claims.is_expired_at(Utc::now()) {
            return self
                .fail(epoch, InvalidationReason::Expired, SessionError::TokenExpired)
                .await;
        }

        let profile = match self.inner.backend.fetch_profile(&token).await {
            Ok(profile) => profile,
            Err(err) => {
                let reason = if err.is_authorization() {
                    InvalidationReason::Unauthorized
                } else {
                    InvalidationReason::NetworkFailure
                };
                return self.fail(epoch, reason, err.into()).await;
            }
        };

        let session = Session {
            profile,
            role: claims.role,
            expires_at: claims.expires_at(),
            token,
        };

        let guard = self.inner.commit.lock().await;
        if self.epoch() != epoch {
            debug!(epoch, ?origin, "Validation superseded");
            return Err(SessionError::Superseded);
        }

        if !self.inner.options.auto_refresh {
            self.inner
                .state_tx
                .send_replace(SessionState::Authenticated(session.clone()));
            info!(user = %session.profile.email, role = %session.role, ?origin, "Session authenticated");
            return Ok(session);
        }

        let now = Utc::now();
        let delay = claims.refresh_delay(now, self.inner.options.refresh_margin);
        if delay.is_zero()
            && origin.refreshes_inline()
            && self.inner.backend.has_refresh_credential()
        {
            // Already inside the margin: refresh before handing control back.
            self.inner
                .state_tx
                .send_replace(SessionState::Authenticated(session.clone()));
            drop(guard);
            info!(?origin, "Token expires within refresh margin, refreshing now");
            return self.refresh(epoch).await;
        }

        // A refreshed or adopted token that is itself inside the margin, or
        // one with nothing to refresh it, is kept until it actually expires.
        let delay = if delay.is_zero() {
            claims.remaining(now)
        } else {
            delay
        };
        self.arm_refresh(epoch, delay);
        self.inner
            .state_tx
            .send_replace(SessionState::RefreshScheduled(session.clone()));
        drop(guard);

        info!(
            user = %session.profile.email,
            role = %session.role,
            ?origin,
            refresh_in_secs = delay.as_secs(),
            "Session authenticated"
        );
        Ok(session)
    }

    /// Arms the single refresh timer for the session started at `epoch`.
    fn arm_refresh(&self, epoch: u64, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer.arm(delay, move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = SessionManager { inner };
            if let Err(err) = manager.refresh(epoch).await {
                debug!(error = %err, "Scheduled refresh did not produce a session");
            }
        });
    }

    /// `RefreshScheduled → Validating`: exchanges the refresh cookie for a
    /// new token and validates it like a login.
    fn refresh(&self, epoch: u64) -> SessionFuture<'_> {
        Box::pin(async move {
            {
                let _guard = self.inner.commit.lock().await;
                if self.epoch() != epoch {
                    return Err(SessionError::Superseded);
                }
                if let Some(remaining) = self.keep_without_credential(epoch) {
                    info!(
                        expires_in_secs = remaining.as_secs(),
                        "No refresh credential, keeping current token"
                    );
                    return Err(SessionError::NoRefreshCredential);
                }
                self.inner.state_tx.send_replace(SessionState::Validating);
            }

            info!("Refreshing session token");
            match self.inner.backend.refresh_token().await {
                Ok(token) => {
                    let token = token.trim().to_string();
                    let epoch = self.begin(Some(epoch), &token, self.scope(), true).await?;
                    self.publish(SessionSignal::TokenChanged {
                        origin: self.inner.id,
                    });
                    self.validate(epoch, token, ValidationOrigin::Refresh).await
                }
                Err(err) => {
                    warn!(error = %err, "Token refresh failed");
                    if self
                        .invalidate(Some(epoch), InvalidationReason::RefreshFailed, true)
                        .await
                    {
                        Err(SessionError::RefreshFailed(err))
                    } else {
                        Err(SessionError::Superseded)
                    }
                }
            }
        })
    }

    /// Without a refresh credential an unexpired session is kept as is and
    /// its timer moved to the token's expiry. Returns the time left, or
    /// `None` when the refresh endpoint should be called anyway.
    fn keep_without_credential(&self, epoch: u64) -> Option<Duration> {
        if self.inner.backend.has_refresh_credential() {
            return None;
        }
        let session = self.session()?;
        let remaining = (session.expires_at - Utc::now()).to_std().ok()?;
        if remaining.is_zero() {
            return None;
        }
        if self.inner.options.auto_refresh {
            self.arm_refresh(epoch, remaining);
            self.inner
                .state_tx
                .send_replace(SessionState::RefreshScheduled(session));
        }
        Some(remaining)
    }

    async fn fail(
        &self,
        epoch: u64,
        reason: InvalidationReason,
        err: SessionError,
    ) -> SessionResult<Session> {
        warn!(%reason, error = %err, "Session validation failed");
        if self.invalidate(Some(epoch), reason, true).await {
            Err(err)
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Ends the session: clears both scopes, cancels the timer, sets
    /// `Unauthenticated`. With `expected`, does nothing unless that epoch
    /// is still current. Returns true if the session was ended.
    async fn invalidate(
        &self,
        expected: Option<u64>,
        reason: InvalidationReason,
        broadcast: bool,
    ) -> bool {
        {
            let _guard = self.inner.commit.lock().await;
            if expected.is_some_and(|epoch| epoch != self.epoch()) {
                debug!(%reason, "Invalidation superseded");
                return false;
            }

            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.timer.cancel();
            if let Err(err) = self.inner.storage.clear() {
                warn!(error = %err, "Failed to clear token storage");
            }
            *lock(&self.inner.last_invalidation) = Some(reason);
            self.inner
                .state_tx
                .send_replace(SessionState::Unauthenticated);
        }

        info!(%reason, "Session ended");
        if broadcast {
            self.publish(SessionSignal::TokenCleared {
                origin: self.inner.id,
            });
        }
        true
    }

    // =========================================================================
    // Cross-Instance Signals
    // =========================================================================

    fn attach_listener(&self) {
        let mut listener = lock(&self.inner.listener);
        if listener.is_some() {
            return;
        }

        let mut rx = self.inner.bus.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.id;

        *listener = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(signal) => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        SessionManager { inner }.handle_signal(signal).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%id, skipped, "Session bus listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(%id, "Session bus listener stopped");
        }));
    }

    async fn handle_signal(&self, signal: SessionSignal) {
        if signal.origin() == self.inner.id {
            return;
        }
        debug!(?signal, "Session signal received");

        match signal {
            SessionSignal::TokenChanged { .. } => {
                // Only the durable scope is shared between instances.
                match self.inner.storage.get(StorageScope::Durable) {
                    Ok(Some(token)) => {
                        if self.session().is_some_and(|session| session.token() == token) {
                            return;
                        }
                        match self.begin(None, &token, StorageScope::Durable, false).await {
                            Ok(epoch) => match self
                                .validate(epoch, token, ValidationOrigin::CrossContext)
                                .await
                            {
                                Ok(session) => {
                                    debug!(user = %session.profile.email, "Adopted shared token")
                                }
                                Err(err) => debug!(error = %err, "Shared token not adopted"),
                            },
                            Err(err) => warn!(error = %err, "Failed to adopt shared token"),
                        }
                    }
                    Ok(None) => {
                        if self.scope() == StorageScope::Durable && !self.state().is_unauthenticated() {
                            self.invalidate(None, InvalidationReason::RemovedElsewhere, false)
                                .await;
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to read shared token"),
                }
            }
            SessionSignal::TokenCleared { .. } => {
                if !self.state().is_unauthenticated() {
                    self.invalidate(None, InvalidationReason::RemovedElsewhere, false)
                        .await;
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::storage::MemoryTokenStorage;
    use async_trait::async_trait;
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use storefront_api::ApiResult;
    use storefront_core::ResourceId;

    // =========================================================================
    // Scripted backend
    // =========================================================================

    #[derive(Debug, Clone, Copy)]
    enum Failure {
        Unauthorized,
        Network,
    }

    #[derive(Default)]
    struct FakeBackend {
        profile_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        failure: StdMutex<Option<Failure>>,
        delays: StdMutex<HashMap<String, Duration>>,
        refreshed: StdMutex<VecDeque<String>>,
        issued: StdMutex<Option<String>>,
        no_credential: AtomicBool,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn fail_with(&self, failure: Failure) {
            *self.failure.lock().unwrap() = Some(failure);
        }

        fn delay(&self, token: &str, delay: Duration) {
            self.delays.lock().unwrap().insert(token.to_string(), delay);
        }

        fn queue_refresh(&self, token: String) {
            self.refreshed.lock().unwrap().push_back(token);
        }

        fn drop_refresh_credential(&self) {
            self.no_credential.store(true, Ordering::SeqCst);
        }

        fn issue_on_login(&self, token: String) {
            *self.issued.lock().unwrap() = Some(token);
        }

        fn profile_calls(&self) -> usize {
            self.profile_calls.load(Ordering::SeqCst)
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn fetch_profile(&self, token: &str) -> ApiResult<UserProfile> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays.lock().unwrap().get(token).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let failure = *self.failure.lock().unwrap();
            match failure {
                Some(Failure::Unauthorized) => Err(ApiError::Unauthorized {
                    status: 401,
                    message: "jwt expired".into(),
                }),
                Some(Failure::Network) => Err(ApiError::Network("connection refused".into())),
                None => {
                    let name = subject(token);
                    Ok(UserProfile {
                        id: ResourceId::new(name.clone()),
                        email: format!("{}@example.com", name),
                        name,
                        address: None,
                        profile_picture: None,
                        role: None,
                    })
                }
            }
        }

        async fn refresh_token(&self) -> ApiResult<String> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.refreshed.lock().unwrap().pop_front();
            next.ok_or_else(|| ApiError::Unauthorized {
                status: 401,
                message: "refresh token missing".into(),
            })
        }

        fn has_refresh_credential(&self) -> bool {
            !self.no_credential.load(Ordering::SeqCst)
        }

        async fn login(&self, _credentials: &Credentials) -> ApiResult<String> {
            let issued = self.issued.lock().unwrap().clone();
            issued.ok_or_else(|| ApiError::Unauthorized {
                status: 401,
                message: "invalid credentials".into(),
            })
        }

        async fn register(&self, _registration: &Registration) -> ApiResult<()> {
            Ok(())
        }

        fn oauth_start_url(&self) -> ApiResult<Url> {
            Ok(Url::parse("http://localhost:5000/api/auth/google")?)
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn mint(expires_in: i64, role: &str, sub: &str) -> String {
        let claims = json!({
            "exp": Utc::now().timestamp() + expires_in,
            "role": role,
            "sub": sub,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server")).unwrap()
    }

    fn subject(token: &str) -> String {
        #[derive(Deserialize)]
        struct Subject {
            sub: String,
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        decode::<Subject>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims.sub)
            .unwrap_or_default()
    }

    fn manager_with(
        backend: &Arc<FakeBackend>,
        storage: &MemoryTokenStorage,
        bus: &LocalBus,
        options: SessionOptions,
    ) -> SessionManager {
        SessionManager::new(
            backend.clone(),
            Arc::new(storage.clone()),
            Arc::new(bus.clone()),
            options,
        )
    }

    fn manager(backend: &Arc<FakeBackend>, storage: &MemoryTokenStorage) -> SessionManager {
        manager_with(backend, storage, &LocalBus::new(), SessionOptions::default())
    }

    async fn wait_until(
        manager: &SessionManager,
        done: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        let mut rx = manager.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(done))
            .await
            .expect("state never reached")
            .expect("manager dropped")
            .clone();
        state
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_login_schedules_refresh_before_expiry() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let session = manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();

        assert_eq!(session.profile.name, "sari");
        assert_eq!(session.role, Role::User);
        assert!(matches!(manager.state(), SessionState::RefreshScheduled(_)));
        assert_eq!(backend.refresh_calls(), 0);

        let due = manager.refresh_due_in().unwrap();
        assert!(due > Duration::from_secs(3_530) && due <= Duration::from_secs(3_540));

        assert!(storage.get(StorageScope::Tab).unwrap().is_some());
        assert!(storage.get(StorageScope::Durable).unwrap().is_none());
        assert_eq!(manager.landing_route(), "/user");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_is_rejected_without_profile_fetch() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let err = manager
            .login(&mint(-10, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::TokenExpired));
        assert!(manager.state().is_unauthenticated());
        assert_eq!(manager.last_invalidation(), Some(InvalidationReason::Expired));
        assert_eq!(backend.profile_calls(), 0);
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_token_is_treated_as_logout() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let err = manager.login("garbage", StorageScope::Durable).await.unwrap_err();

        assert!(matches!(err, SessionError::MalformedToken(_)));
        assert!(manager.state().is_unauthenticated());
        assert_eq!(
            manager.last_invalidation(),
            Some(InvalidationReason::MalformedToken)
        );
        assert!(storage.is_empty().unwrap());
        assert_eq!(manager.landing_route(), LOGIN_ROUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_profile_clears_storage() {
        let backend = FakeBackend::new();
        backend.fail_with(Failure::Unauthorized);
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let err = manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap_err();

        assert!(err.is_authorization());
        assert!(manager.state().is_unauthenticated());
        assert_eq!(
            manager.last_invalidation(),
            Some(InvalidationReason::Unauthorized)
        );
        assert!(storage.is_empty().unwrap());
        assert!(manager.refresh_due_in().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_degrades_to_unauthenticated() {
        let backend = FakeBackend::new();
        backend.fail_with(Failure::Network);
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let err = manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap_err();

        assert!(!err.is_authorization());
        assert!(manager.state().is_unauthenticated());
        assert_eq!(
            manager.last_invalidation(),
            Some(InvalidationReason::NetworkFailure)
        );
        assert!(storage.is_empty().unwrap());
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_second_login_cancels_first_timer() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        manager
            .login(&mint(600, "USER", "first"), StorageScope::Tab)
            .await
            .unwrap();
        manager
            .login(&mint(7_200, "USER", "second"), StorageScope::Tab)
            .await
            .unwrap();

        // Well past the first token's refresh point.
        tokio::time::sleep(Duration::from_secs(1_200)).await;

        assert_eq!(backend.refresh_calls(), 0);
        let session = manager.session().unwrap();
        assert_eq!(session.profile.name, "second");
        assert!(manager.refresh_due_in().unwrap() > Duration::from_secs(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_refresh_replaces_pending_timer() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        assert!(matches!(
            manager.schedule_refresh(Utc::now()).await,
            Err(SessionError::NotAuthenticated)
        ));

        manager
            .login(&mint(7_200, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();
        backend.queue_refresh(mint(7_200, "USER", "sari"));

        let delay = manager
            .schedule_refresh(Utc::now() + chrono::Duration::seconds(120))
            .await
            .unwrap();
        assert!(delay <= Duration::from_secs(60));
        assert!(manager.refresh_due_in().unwrap() <= Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(backend.refresh_calls(), 1);
        assert!(manager.refresh_due_in().unwrap() > Duration::from_secs(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_inside_margin_refreshes_before_login_returns() {
        let backend = FakeBackend::new();
        backend.queue_refresh(mint(3_600, "USER", "sari"));
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let original = mint(55, "USER", "sari");
        let session = manager.login(&original, StorageScope::Tab).await.unwrap();

        assert_eq!(backend.refresh_calls(), 1);
        assert_ne!(session.token(), original);
        assert!(matches!(manager.state(), SessionState::RefreshScheduled(_)));
        assert_eq!(
            storage.get(StorageScope::Tab).unwrap().as_deref(),
            Some(session.token())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_token_inside_margin_waits_for_expiry() {
        let backend = FakeBackend::new();
        backend.queue_refresh(mint(30, "USER", "sari"));
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        manager
            .login(&mint(55, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();

        assert_eq!(backend.refresh_calls(), 1);
        assert!(matches!(manager.state(), SessionState::RefreshScheduled(_)));
        assert!(manager.refresh_due_in().unwrap() <= Duration::from_secs(30));

        // The next refresh finds nothing queued and the session ends.
        let state = wait_until(&manager, |state| state.is_unauthenticated()).await;
        assert!(state.is_unauthenticated());
        assert_eq!(backend.refresh_calls(), 2);
        assert_eq!(
            manager.last_invalidation(),
            Some(InvalidationReason::RefreshFailed)
        );
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refresh_replaces_token() {
        let backend = FakeBackend::new();
        let renewed = mint(7_200, "ADMIN", "dewi");
        backend.queue_refresh(renewed.clone());
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        manager
            .login(&mint(120, "ADMIN", "dewi"), StorageScope::Durable)
            .await
            .unwrap();

        let state = wait_until(&manager, |state| {
            state.session().is_some_and(|session| session.token() == renewed)
        })
        .await;

        assert!(matches!(state, SessionState::RefreshScheduled(_)));
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(
            storage.get(StorageScope::Durable).unwrap().as_deref(),
            Some(renewed.as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_failure_ends_session() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        assert!(matches!(
            manager.refresh_now().await,
            Err(SessionError::NotAuthenticated)
        ));

        manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();
        let err = manager.refresh_now().await.unwrap_err();

        assert!(matches!(err, SessionError::RefreshFailed(_)));
        assert!(manager.state().is_unauthenticated());
        assert!(manager.refresh_due_in().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_refresh_credential_keeps_token_until_expiry() {
        let backend = FakeBackend::new();
        backend.drop_refresh_credential();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        // Inside the margin, but nothing to refresh with.
        let token = mint(30, "USER", "sari");
        let session = manager.login(&token, StorageScope::Durable).await.unwrap();
        assert_eq!(session.token(), token);
        assert_eq!(backend.refresh_calls(), 0);
        assert!(manager.refresh_due_in().unwrap() <= Duration::from_secs(30));

        let err = manager.refresh_now().await.unwrap_err();
        assert!(matches!(err, SessionError::NoRefreshCredential));
        assert_eq!(backend.refresh_calls(), 0);
        assert!(matches!(manager.state(), SessionState::RefreshScheduled(_)));
        assert_eq!(
            storage.get(StorageScope::Durable).unwrap().as_deref(),
            Some(token.as_str())
        );
        assert_eq!(manager.last_invalidation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_disabled() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let options = SessionOptions {
            auto_refresh: false,
            ..SessionOptions::default()
        };
        let manager = manager_with(&backend, &storage, &LocalBus::new(), options);

        manager
            .login(&mint(30, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();

        assert!(matches!(manager.state(), SessionState::Authenticated(_)));
        assert!(manager.refresh_due_in().is_none());
        assert_eq!(backend.refresh_calls(), 0);
    }

    // =========================================================================
    // Logout / Ordering
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_idempotent() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        manager.logout().await;
        assert!(manager.state().is_unauthenticated());

        manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap();
        storage.set(StorageScope::Tab, "stray").unwrap();

        manager.logout().await;
        manager.logout().await;

        assert!(manager.state().is_unauthenticated());
        assert!(storage.is_empty().unwrap());
        assert!(manager.refresh_due_in().is_none());
        assert_eq!(manager.last_invalidation(), Some(InvalidationReason::Logout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_validation_is_superseded() {
        let backend = FakeBackend::new();
        let slow = mint(3_600, "USER", "slow");
        backend.delay(&slow, Duration::from_secs(10));
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login(&slow, StorageScope::Tab).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        manager
            .login(&mint(3_600, "USER", "fast"), StorageScope::Tab)
            .await
            .unwrap();

        let stale = first.await.unwrap();
        assert!(matches!(stale, Err(SessionError::Superseded)));
        assert_eq!(manager.session().unwrap().profile.name, "fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_during_validation_wins() {
        let backend = FakeBackend::new();
        let slow = mint(3_600, "USER", "slow");
        backend.delay(&slow, Duration::from_secs(10));
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login(&slow, StorageScope::Durable).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(manager.state().is_validating());

        manager.logout().await;

        assert!(matches!(pending.await.unwrap(), Err(SessionError::Superseded)));
        assert!(manager.state().is_unauthenticated());
        assert!(storage.is_empty().unwrap());
    }

    // =========================================================================
    // Startup
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_startup_restores_stored_token() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        storage
            .set(StorageScope::Durable, &mint(3_600, "ADMIN", "dewi"))
            .unwrap();

        let manager = manager(&backend, &storage);
        assert!(manager.state().is_validating());
        assert!(manager.current_user().is_none());

        let state = manager.start().await;
        assert!(matches!(state, SessionState::RefreshScheduled(_)));

        let user = manager.current_user().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(manager.landing_route(), "/admin");
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_with_expired_token() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        storage
            .set(StorageScope::Tab, &mint(-60, "USER", "sari"))
            .unwrap();

        let manager = manager(&backend, &storage);
        let state = manager.start().await;

        assert!(state.is_unauthenticated());
        assert_eq!(manager.last_invalidation(), Some(InvalidationReason::Expired));
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_without_token() {
        let backend = FakeBackend::new();
        let manager = manager(&backend, &MemoryTokenStorage::new());
        assert!(manager.state().is_unauthenticated());
        assert!(manager.start().await.is_unauthenticated());
        assert_eq!(manager.last_invalidation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_validation() {
        let backend = FakeBackend::new();
        let token = mint(3_600, "USER", "sari");
        backend.delay(&token, Duration::from_secs(5));
        let storage = MemoryTokenStorage::new();
        storage.set(StorageScope::Durable, &token).unwrap();

        let manager = manager(&backend, &storage);
        let starter = manager.clone();
        tokio::spawn(async move { starter.start().await });

        let state = manager.settled().await;
        assert!(state.is_authenticated());
    }

    // =========================================================================
    // Cross-Instance
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_login_elsewhere_is_adopted() {
        let backend = FakeBackend::new();
        let bus = LocalBus::new();
        let storage_a = MemoryTokenStorage::new();
        let storage_b = storage_a.new_tab();
        let a = manager_with(&backend, &storage_a, &bus, SessionOptions::default());
        let b = manager_with(&backend, &storage_b, &bus, SessionOptions::default());
        a.start().await;
        b.start().await;

        let session = a
            .login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap();

        let state = wait_until(&b, |state| state.is_authenticated()).await;
        let adopted = state.session().unwrap();
        assert_eq!(adopted.profile, session.profile);
        assert_eq!(adopted.token(), session.token());
        assert_eq!(backend.profile_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lived_refresh_is_not_refreshed_again_elsewhere() {
        let backend = FakeBackend::new();
        let bus = LocalBus::new();
        let storage_a = MemoryTokenStorage::new();
        let storage_b = storage_a.new_tab();
        let a = manager_with(&backend, &storage_a, &bus, SessionOptions::default());
        let b = manager_with(&backend, &storage_b, &bus, SessionOptions::default());
        a.start().await;
        b.start().await;

        for n in 0..10 {
            backend.queue_refresh(mint(30, "USER", &format!("sari-{}", n)));
        }

        a.login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap();
        wait_until(&b, |state| state.is_authenticated()).await;

        let refreshed = a.refresh_now().await.unwrap();
        assert_eq!(refreshed.profile.name, "sari-0");

        let state = wait_until(&b, |state| {
            state
                .session()
                .is_some_and(|session| session.profile.name == "sari-0")
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(matches!(state, SessionState::RefreshScheduled(_)));
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(a.session().unwrap().profile.name, "sari-0");
        assert_eq!(b.session().unwrap().profile.name, "sari-0");
        assert!(a.refresh_due_in().unwrap() <= Duration::from_secs(30));
        assert!(b.refresh_due_in().unwrap() <= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_elsewhere_ends_session() {
        let backend = FakeBackend::new();
        let bus = LocalBus::new();
        let storage_a = MemoryTokenStorage::new();
        let storage_b = storage_a.new_tab();
        let a = manager_with(&backend, &storage_a, &bus, SessionOptions::default());
        let b = manager_with(&backend, &storage_b, &bus, SessionOptions::default());
        a.start().await;
        b.start().await;

        a.login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap();
        wait_until(&b, |state| state.is_authenticated()).await;

        a.logout().await;

        wait_until(&b, |state| state.is_unauthenticated()).await;
        assert_eq!(
            b.last_invalidation(),
            Some(InvalidationReason::RemovedElsewhere)
        );
        assert!(b.refresh_due_in().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_login_is_private() {
        let backend = FakeBackend::new();
        let bus = LocalBus::new();
        let storage_a = MemoryTokenStorage::new();
        let storage_b = storage_a.new_tab();
        let a = manager_with(&backend, &storage_a, &bus, SessionOptions::default());
        let b = manager_with(&backend, &storage_b, &bus, SessionOptions::default());
        a.start().await;
        b.start().await;

        a.login(&mint(3_600, "USER", "sari"), StorageScope::Tab)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(b.state().is_unauthenticated());
        assert_eq!(backend.profile_calls(), 1);
    }

    // =========================================================================
    // Authorization / Entry Points
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_authorize_checks_role() {
        let backend = FakeBackend::new();
        let manager = manager(&backend, &MemoryTokenStorage::new());

        assert!(matches!(
            manager.authorize(Role::User),
            Err(SessionError::NotAuthenticated)
        ));

        let token = mint(3_600, "USER", "sari");
        manager.login(&token, StorageScope::Tab).await.unwrap();

        assert_eq!(manager.authorize(Role::User).unwrap(), token);
        assert!(matches!(
            manager.authorize(Role::Admin),
            Err(SessionError::Forbidden {
                required: Role::Admin,
                actual: Role::User
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_rejection_ends_session() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);
        manager
            .login(&mint(3_600, "USER", "sari"), StorageScope::Durable)
            .await
            .unwrap();

        let offline = ApiError::Network("timeout".into());
        assert!(!manager.handle_api_error(&offline).await);
        assert!(manager.state().is_authenticated());

        let rejected = ApiError::Unauthorized {
            status: 403,
            message: "forbidden".into(),
        };
        assert!(manager.handle_api_error(&rejected).await);
        assert!(manager.state().is_unauthenticated());
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_from_redirect() {
        let backend = FakeBackend::new();
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let err = manager
            .login_from_redirect("http://localhost:3000/oauth/callback?state=x")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingRedirectToken));
        assert!(manager.last_invalidation().is_none());

        let token = mint(3_600, "USER", "sari");
        let redirect = format!("http://localhost:3000/oauth/callback?token={}", token);
        manager.login_from_redirect(&redirect).await.unwrap();

        assert_eq!(
            storage.get(StorageScope::Durable).unwrap(),
            Some(token)
        );
        assert_eq!(
            manager.oauth_start_url().unwrap().path(),
            "/api/auth/google"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_choose_scope() {
        let backend = FakeBackend::new();
        let token = mint(3_600, "USER", "sari");
        backend.issue_on_login(token.clone());
        let storage = MemoryTokenStorage::new();
        let manager = manager(&backend, &storage);

        let mut credentials = Credentials {
            email: "sari@example.com".into(),
            password: "rahasia1".into(),
            remember_me: false,
        };
        manager.login_with_credentials(&credentials).await.unwrap();
        assert_eq!(storage.get(StorageScope::Tab).unwrap(), Some(token.clone()));
        assert_eq!(storage.get(StorageScope::Durable).unwrap(), None);

        credentials.remember_me = true;
        manager.login_with_credentials(&credentials).await.unwrap();
        assert_eq!(storage.get(StorageScope::Durable).unwrap(), Some(token));
        assert_eq!(storage.get(StorageScope::Tab).unwrap(), None);

        credentials.password = String::new();
        let err = manager.login_with_credentials(&credentials).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Validation(_))));
    }
}
