//! The auth gateway: sole owner and writer of the session.
//!
//! Every network operation that needs the bearer token goes through
//! [`AuthGateway::authenticated_request`], which is also where a 401 turns
//! into a forced sign-out. Readers observe the session through
//! [`AuthSnapshot`]s published on a watch channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{AuthError, SessionStore};
use crate::api::{ApiError, ApiRequest, ApiResponse, HttpTransport, Method, Transport};
use crate::config::Config;
use crate::models::payloads::{LoginResponse, RefreshResponse, UserEnvelope, VerifyResponse};
use crate::models::{Credentials, PasswordChange, Registration, Role, Session, User};
use crate::storage::open_store;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const PROFILE_PATH: &str = "/auth/profile";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
pub const VERIFY_PATH: &str = "/auth/verify";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// What readers see of the auth state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    /// Whether the persisted session has been consulted yet.
    pub hydrated: bool,
    /// Whether an auth operation is in flight.
    pub loading: bool,
    pub session: Option<Session>,
}

impl AuthSnapshot {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(Session::role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    /// Advanced on every sign-in and sign-out. Writes that follow a network
    /// await only land if the epoch is unchanged.
    epoch: u64,
    expires_at: Option<DateTime<Utc>>,
    in_flight: usize,
    hydrated: bool,
}

impl AuthState {
    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            hydrated: self.hydrated,
            loading: self.in_flight > 0,
            session: self.session.clone(),
        }
    }
}

pub struct AuthGateway {
    transport: Arc<dyn Transport>,
    store: SessionStore,
    timeout: Duration,
    state: Mutex<AuthState>,
    snapshots: watch::Sender<AuthSnapshot>,
}

/// Marks an auth operation as in flight for as long as it is alive.
struct LoadingGuard<'a> {
    gateway: &'a AuthGateway,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(gateway: &'a AuthGateway) -> Self {
        let mut state = gateway.lock();
        state.in_flight += 1;
        gateway.publish(&state);
        Self { gateway }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gateway.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.gateway.publish(&state);
    }
}

impl AuthGateway {
    pub fn new(transport: impl Transport + 'static, store: SessionStore, timeout: Duration) -> Self {
        Self::with_transport(Arc::new(transport), store, timeout)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, store: SessionStore, timeout: Duration) -> Self {
        let (snapshots, _) = watch::channel(AuthSnapshot::default());
        Self {
            transport,
            store,
            timeout,
            state: Mutex::new(AuthState::default()),
            snapshots,
        }
    }

    /// Build a gateway talking to the configured API and storage backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let transport = HttpTransport::new(&config.api_base_url, timeout)
            .context("Failed to create HTTP client")?;
        let data_dir = config.data_dir()?;
        let store = SessionStore::from_boxed(open_store(config.storage, &data_dir));
        Ok(Self::new(transport, store, timeout))
    }

    // =========================================================================
    // Session state
    // =========================================================================

    /// Restore the persisted session, if any, and mark hydration complete.
    ///
    /// A session established by `login` before hydration is kept.
    pub fn hydrate(&self) -> Option<Session> {
        // The store is read under the state lock so a concurrent logout
        // cannot land between the read and the install.
        let mut state = self.lock();
        if !state.hydrated {
            state.hydrated = true;
            if state.session.is_none() {
                if let Some(session) = self.store.load() {
                    debug!(user_id = session.user.id, "Session restored");
                    state.epoch += 1;
                    state.session = Some(session);
                }
            }
        }
        self.publish(&state);
        state.session.clone()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.lock().snapshot()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().session.as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    /// Estimated token expiry, known only for tokens obtained in this process.
    /// A session restored by `hydrate` has no estimate until the next
    /// `refresh_token`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.lock().expires_at
    }

    /// Check if the token will expire soon and should be refreshed.
    ///
    /// Always false without an expiry estimate, see [`Self::expires_at`].
    pub fn needs_refresh(&self) -> bool {
        let state = self.lock();
        match (state.session.as_ref(), state.expires_at) {
            (Some(_), Some(expires_at)) => expires_at
                .checked_sub_signed(chrono::Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES))
                .map_or(true, |refresh_at| Utc::now() > refresh_at),
            _ => false,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Sign in and persist the new session.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let _loading = LoadingGuard::acquire(self);
        info!(username = %credentials.username, "Signing in");

        let request = ApiRequest::new(Method::Post, LOGIN_PATH).json(json!({
            "username": credentials.username,
            "password": credentials.password,
        }));
        let response = self.dispatch(request).await.inspect_err(|e| {
            warn!(error = %e, "Sign-in request failed");
        })?;

        if !response.is_success() {
            let err = ApiError::from_status(response.status, &response.body);
            warn!(status = response.status, error = %err, "Sign-in rejected");
            return Err(err.into());
        }

        let body: LoginResponse = response.json()?;
        let session = Session::new(body.token, body.user);
        let expires_at = expiry_after(body.expires_in);

        {
            let mut state = self.lock();
            if let Err(e) = self.store.save(&session) {
                warn!(error = %e, "Failed to persist session, it will not survive a restart");
            }
            state.epoch += 1;
            state.session = Some(session.clone());
            state.expires_at = expires_at;
            self.publish(&state);
        }

        info!(user_id = session.user.id, role = %session.role(), "Signed in");
        Ok(session.user)
    }

    /// Drop the session, in memory and on disk. Safe to call when signed out.
    pub fn logout(&self) {
        let mut state = self.lock();
        self.end_session(&mut state);
    }

    fn end_session(&self, state: &mut AuthState) {
        let had_session = state.session.take().is_some();
        state.epoch += 1;
        state.expires_at = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.publish(state);

        if had_session {
            info!("Signed out");
        }
    }

    /// Create an account. The new account is not signed in.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let _loading = LoadingGuard::acquire(self);
        info!(username = %registration.username, role = %registration.role_type, "Registering account");

        let body = serde_json::to_value(registration).map_err(|e| ApiError::Encode(e.to_string()))?;
        let response = self
            .dispatch(ApiRequest::new(Method::Post, REGISTER_PATH).json(body))
            .await?;

        if !response.is_success() {
            let err = ApiError::from_status(response.status, &response.body);
            warn!(status = response.status, error = %err, "Registration rejected");
            return Err(err.into());
        }

        let envelope: UserEnvelope = response.json()?;
        let user = Self::parse_user(envelope.user)?;
        info!(user_id = user.id, "Account registered");
        Ok(user)
    }

    /// Send profile changes and merge the server's answer into the session.
    pub async fn update_profile(&self, fields: Map<String, Value>) -> Result<User, AuthError> {
        let (user, epoch) = self.signed_in()?;
        let _loading = LoadingGuard::acquire(self);

        let envelope: UserEnvelope = self
            .authenticated_request(Method::Put, PROFILE_PATH, Some(Value::Object(fields)))
            .await?;

        self.apply_user(epoch, &user, |current| current.merged_with(&envelope.user))
    }

    /// Re-read the profile from the server, replacing the cached user.
    pub async fn fetch_profile(&self) -> Result<User, AuthError> {
        let (user, epoch) = self.signed_in()?;

        let envelope: UserEnvelope = self
            .authenticated_request(Method::Get, PROFILE_PATH, None)
            .await?;

        self.apply_user(epoch, &user, |_| serde_json::from_value(Value::Object(envelope.user.clone())))
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), AuthError> {
        self.signed_in()?;
        let _loading = LoadingGuard::acquire(self);

        let body = serde_json::to_value(change).map_err(|e| ApiError::Encode(e.to_string()))?;
        let _: Value = self
            .authenticated_request(Method::Post, CHANGE_PASSWORD_PATH, Some(body))
            .await?;

        info!("Password changed");
        Ok(())
    }

    /// Ask the server whether the current token is still valid.
    pub async fn verify(&self) -> Result<bool, AuthError> {
        self.signed_in()?;
        let response: VerifyResponse = self.authenticated_request(Method::Get, VERIFY_PATH, None).await?;
        Ok(response.valid)
    }

    /// Exchange the current token for a fresh one. The user is unchanged.
    pub async fn refresh_token(&self) -> Result<(), AuthError> {
        let (_, epoch) = self.signed_in()?;

        let response: RefreshResponse = self.authenticated_request(Method::Post, REFRESH_PATH, None).await?;
        let expires_at = expiry_after(response.expires_in);

        let mut state = self.lock();
        if state.epoch != epoch {
            info!("Session ended during token refresh, discarding new token");
            return Ok(());
        }
        let Some(mut session) = state.session.clone() else {
            return Ok(());
        };
        session.token = response.token;
        if let Err(e) = self.store.save(&session) {
            warn!(error = %e, "Failed to persist refreshed token");
        }
        state.session = Some(session);
        state.expires_at = expires_at;
        self.publish(&state);

        debug!("Token refreshed");
        Ok(())
    }

    /// Issue a request with the current bearer token attached.
    ///
    /// A 401 signs the user out and yields `SessionExpired` without looking
    /// at the body. The sign-out only applies to the session the request was
    /// sent under; one started while the request was in flight is kept.
    /// Other non-success statuses yield `Rejected` with the server's `error`
    /// message when it sent one.
    pub async fn authenticated_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, AuthError> {
        let (token, epoch) = {
            let state = self.lock();
            (state.session.as_ref().map(|s| s.token.clone()), state.epoch)
        };
        let mut request = ApiRequest::new(method, endpoint).bearer(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.dispatch(request).await?;

        if response.status == 401 {
            let mut state = self.lock();
            if state.epoch == epoch {
                warn!(%method, endpoint, "Token rejected by server, signing out");
                self.end_session(&mut state);
            } else {
                info!(%method, endpoint, "Token rejected for a session that already ended");
            }
            return Err(AuthError::SessionExpired);
        }
        if !response.is_success() {
            let err = ApiError::from_status(response.status, &response.body);
            warn!(%method, endpoint, status = response.status, error = %err, "Request rejected");
            return Err(err.into());
        }

        Ok(response.json()?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &AuthState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Current user and epoch, or `NotAuthenticated`.
    fn signed_in(&self) -> Result<(User, u64), AuthError> {
        let state = self.lock();
        match state.session.as_ref() {
            Some(session) if !session.token.is_empty() => Ok((session.user.clone(), state.epoch)),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Replace the session's user with `update(current)`.
    ///
    /// If the session ended while the request was in flight, the update is
    /// applied to the user captured before the request and returned, but the
    /// cleared session stays cleared.
    fn apply_user<F>(&self, epoch: u64, captured: &User, update: F) -> Result<User, AuthError>
    where
        F: Fn(&User) -> Result<User, serde_json::Error>,
    {
        let mut state = self.lock();

        let live = state.session.as_ref().filter(|_| state.epoch == epoch).cloned();
        let Some(mut session) = live else {
            info!("Session ended while profile request was in flight, not restoring it");
            return update(captured).map_err(|e| ApiError::InvalidResponse(e.to_string()).into());
        };

        let user = update(&session.user).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        session.user = user.clone();
        if let Err(e) = self.store.save(&session) {
            warn!(error = %e, "Failed to persist updated profile");
        }
        state.session = Some(session);
        self.publish(&state);

        debug!(user_id = user.id, "Profile updated");
        Ok(user)
    }

    fn parse_user(fields: Map<String, Value>) -> Result<User, AuthError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
    }

    /// Send with the configured upper bound on how long to wait.
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();

        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%method, path = %path, timeout_secs = self.timeout.as_secs(), "Request timed out");
                Err(ApiError::Timeout)
            }
        }
    }
}

/// Absolute expiry for a token valid `expires_in` seconds from now. Values
/// that cannot be represented are treated as unknown.
fn expiry_after(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let secs = expires_in?;
    let expires_at = chrono::Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d));
    if expires_at.is_none() {
        warn!(expires_in = secs, "Ignoring out-of-range token lifetime");
    }
    expires_at
}
