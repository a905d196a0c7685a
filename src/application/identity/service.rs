//! Session service: application-layer orchestration
//!
//! Holds the current identity and credentials, persists them across
//! restarts and keeps the realtime channel in step with the session.
//! Front ends hold an `Arc<SessionService>` and subscribe to
//! [`SessionEvent`]s instead of polling.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::application::events::{EventBus, EventSubscriber, Subscription};
use crate::application::ports::{AuthApi, SessionStorage};
use crate::application::realtime::RealtimeChannel;
use crate::domain::{
    AuthError, Capability, CapabilitySet, ClientError, ClientResult, LogoutReason,
    PersistedSession, Session, SessionEvent, UpdateUserDto, User, UserRole,
};
use crate::infrastructure::crypto::jwt::token_expired;
use crate::shared::rate_limit::RateLimiter;
use crate::shared::shutdown::ShutdownSignal;
use crate::shared::validations::{ChangePasswordForm, LoginForm};

use super::permissions;

pub type SharedSessionService = Arc<SessionService>;

pub struct SessionService {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn SessionStorage>,
    channel: Arc<RealtimeChannel>,
    login_limiter: RateLimiter,
    session: RwLock<Option<Session>>,
    events: EventBus<SessionEvent>,
    disposed: ShutdownSignal,
}

impl SessionService {
    pub fn new(
        api: Arc<dyn AuthApi>,
        storage: Arc<dyn SessionStorage>,
        channel: Arc<RealtimeChannel>,
        login_limiter: RateLimiter,
    ) -> Self {
        Self {
            api,
            storage,
            channel,
            login_limiter,
            session: RwLock::new(None),
            events: EventBus::new("session"),
            disposed: ShutdownSignal::new(),
        }
    }

    pub fn channel(&self) -> &Arc<RealtimeChannel> {
        &self.channel
    }

    pub fn login_limiter(&self) -> &RateLimiter {
        &self.login_limiter
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Restore a persisted session without touching the network.
    ///
    /// Incomplete records and JWTs whose `exp` has passed are discarded.
    pub async fn init(&self) -> Option<User> {
        let record = match self.storage.load().await {
            Ok(record) => record?,
            Err(e) => {
                warn!(error = %e, "Could not read persisted session");
                return None;
            }
        };

        let Some(session) = record.into_session() else {
            warn!("Discarding incomplete persisted session");
            self.clear_storage().await;
            return None;
        };

        if token_expired(session.access_token()) == Some(true) {
            info!(user_id = %session.user.id, "Persisted credential has expired");
            self.clear_storage().await;
            return None;
        }

        let user = session.user.clone();
        let token = session.access_token().to_string();
        *self.write() = Some(session);
        self.open_channel(&token);

        info!(user_id = %user.id, role = %user.role, "🔐 Session restored");
        self.events.publish(SessionEvent::Restored { user: user.clone() });
        Some(user)
    }

    /// Close the channel and detach subscription callbacks. Persisted
    /// state is kept so the next `init()` can restore it.
    pub fn dispose(&self) {
        if self.disposed.trigger() {
            self.channel.close();
            debug!("Session service disposed");
        }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Validate, admit through the login rate limiter, then authenticate.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let form = LoginForm::new(email, password)?;

        if let Err(e) = self.login_limiter.check(&form.email) {
            metrics::counter!("monitor_logins_total", "outcome" => "rate_limited").increment(1);
            warn!(email = %form.email, "Login attempt rate limited");
            return Err(e);
        }

        let response = match self.api.login(&form).await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("monitor_logins_total", "outcome" => "failure").increment(1);
                warn!(email = %form.email, error = %e, "Login failed");
                return Err(e);
            }
        };

        let session = Session::new(response.user.clone(), response.tokens());
        if !session.has_credential() {
            metrics::counter!("monitor_logins_total", "outcome" => "failure").increment(1);
            return Err(AuthError::Unauthorized("login response carried no access token".into()).into());
        }

        self.persist(&session).await;
        let user = session.user.clone();
        let token = session.access_token().to_string();
        *self.write() = Some(session);
        self.open_channel(&token);

        metrics::counter!("monitor_logins_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, role = %user.role, "🔐 User logged in");
        self.events.publish(SessionEvent::LoggedIn { user: user.clone() });
        Ok(user)
    }

    pub async fn logout(&self) {
        self.logout_with(LogoutReason::Manual).await;
    }

    /// Tear the session down. Server-side invalidation is best effort and
    /// never blocks the local teardown.
    pub async fn logout_with(&self, reason: LogoutReason) {
        self.channel.close();
        let previous = self.write().take();

        if let Some(session) = &previous {
            if reason != LogoutReason::CredentialRejected {
                if let Err(e) = self
                    .api
                    .logout(session.access_token(), session.refresh_token())
                    .await
                {
                    warn!(error = %e, "Logout request failed, clearing local session anyway");
                }
            }
        }

        self.clear_storage().await;

        match previous {
            Some(session) => {
                metrics::counter!("monitor_logouts_total", "reason" => reason.as_str()).increment(1);
                info!(user_id = %session.user.id, %reason, "🔒 User logged out");
                self.events.publish(SessionEvent::LoggedOut { reason });
            }
            None => debug!(%reason, "Logout without an active session"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().as_ref().is_some_and(Session::has_credential)
    }

    // ── Profile ─────────────────────────────────────────────────

    /// Merge `update` into the current user and re-persist. `None` when
    /// there is no session.
    pub async fn update_user(&self, update: &UpdateUserDto) -> Option<User> {
        let (user, session) = {
            let mut guard = self.write();
            let session = guard.as_mut()?;
            update.apply_to(&mut session.user);
            (session.user.clone(), session.clone())
        };

        self.persist(&session).await;
        debug!(user_id = %user.id, "User profile updated");
        self.events.publish(SessionEvent::UserUpdated { user: user.clone() });
        Some(user)
    }

    /// Refresh the current user from `GET /api/profile`.
    pub async fn fetch_profile(&self) -> ClientResult<User> {
        let token = self.require_token()?;
        let profile = self.guarded(self.api.get_profile(&token).await).await?;
        Ok(self
            .update_user(&UpdateUserDto::from(&profile))
            .await
            .unwrap_or(profile))
    }

    /// Send `update` to `PUT /api/profile` and merge what the server returns.
    pub async fn save_profile(&self, update: &UpdateUserDto) -> ClientResult<User> {
        if update.is_empty() {
            return Err(ClientError::Validation("profile: nothing to update".to_string()));
        }
        let token = self.require_token()?;
        let profile = self
            .guarded(self.api.update_profile(&token, update).await)
            .await?;
        Ok(self
            .update_user(&UpdateUserDto::from(&profile))
            .await
            .unwrap_or(profile))
    }

    pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> ClientResult<()> {
        let form = ChangePasswordForm::new(current, new, confirm)?;
        let token = self.require_token()?;
        self.guarded(self.api.change_password(&token, &form).await)
            .await?;
        info!("Password changed");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn current_user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token().to_string())
    }

    pub fn role(&self) -> UserRole {
        permissions::get_role(self.read().as_ref().map(|s| &s.user))
    }

    pub fn capabilities(&self) -> &'static CapabilitySet {
        permissions::get_capabilities(self.read().as_ref().map(|s| &s.user))
    }

    pub fn has_permission(&self, capability: Capability) -> bool {
        permissions::has_permission(self.read().as_ref().map(|s| &s.user), capability)
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        permissions::has_role(self.read().as_ref().map(|s| &s.user), roles)
    }

    // ── Subscriptions ───────────────────────────────────────────

    /// Call `callback` for every session event until the handle is dropped
    /// or the service is disposed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(SessionEvent) + Send + 'static,
    {
        self.events.subscribe_fn_until(callback, self.disposed.clone())
    }

    pub fn events(&self) -> EventSubscriber<SessionEvent> {
        self.events.subscribe()
    }

    // ── Internals ───────────────────────────────────────────────

    fn require_token(&self) -> ClientResult<String> {
        self.access_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("no active session".into()).into())
    }

    /// A rejected credential ends the session before the error is returned.
    async fn guarded<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_credential_rejected() {
                warn!(error = %e, "Backend rejected the access credential");
                self.logout_with(LogoutReason::CredentialRejected).await;
            }
        }
        result
    }

    fn open_channel(&self, token: &str) {
        if let Err(e) = self.channel.open(token) {
            warn!(error = %e, "Realtime channel not opened");
        }
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self.storage.save(&PersistedSession::from(session)).await {
            warn!(error = %e, "Could not persist session");
        }
    }

    async fn clear_storage(&self) {
        if let Err(e) = self.storage.clear().await {
            warn!(error = %e, "Could not clear persisted session");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionService {
    fn drop(&mut self) {
        self.disposed.trigger();
    }
}
