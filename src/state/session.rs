//! Session lifecycle: who the current user is, and how that changes.
//!
//! DESIGN
//! ======
//! `SessionManager` is the single owner of authentication state and of the
//! credential token. It is constructed explicitly by the entry point and
//! shared as `Arc<SessionManager>`; consumers read snapshots, subscribe to
//! transitions, or hold a `watch` receiver.
//!
//! State machine:
//!
//! ```text
//! Unresolved -> Resolving -> Authenticated
//!                         -> Unauthenticated
//! Authenticated | Unauthenticated -> Resolving   (login / refresh_profile)
//! ```
//!
//! Every operation ends in `Authenticated` or `Unauthenticated`; failures
//! never leave a partially populated user behind.
//!
//! TRADE-OFFS
//! ==========
//! Overlapping profile resolutions are not cancelled. Each applies its
//! result when its response arrives, so the last *completion* wins.
//! Callers needing strict ordering await one operation before the next.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OnceCell, watch};

use super::store::CredentialStore;
use crate::error::AuthError;
use crate::net::backend::AuthBackend;
use crate::net::types::{Credentials, PasswordChange, Registration, User};

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing attempted yet.
    Unresolved,
    /// A login or profile request is pending.
    Resolving,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the client's authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    phase: SessionPhase,
    loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self { user: None, phase: SessionPhase::Unresolved, loading: true }
    }
}

impl Session {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True only until the first resolution attempt finishes.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// A user is only ever held after a successful profile fetch.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    fn resolving(&mut self) {
        self.phase = SessionPhase::Resolving;
    }

    fn authenticated(&mut self, user: User) {
        self.user = Some(user);
        self.phase = SessionPhase::Authenticated;
        self.loading = false;
    }

    fn unauthenticated(&mut self) {
        self.user = None;
        self.phase = SessionPhase::Unauthenticated;
        self.loading = false;
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

/// Handle returned by [`SessionManager::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&Session) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    listeners: Mutex<Listeners>,
    /// Serializes apply + notify so listeners see transitions in order.
    transition_lock: Mutex<()>,
    /// Bumped by every login. A failed resolution only forgets the
    /// credential if no login has started since it was sent.
    credential_epoch: Mutex<u64>,
    initialized: OnceCell<()>,
}

impl SessionManager {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            backend,
            store,
            state,
            listeners: Mutex::new(Listeners::default()),
            transition_lock: Mutex::new(()),
            credential_epoch: Mutex::new(0),
            initialized: OnceCell::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver that always holds the latest session.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Call `listener` with the new session after every transition.
    ///
    /// Listeners run synchronously on the task performing the transition and
    /// must not block.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    /// Entry URL for the external Google login flow, if the backend has one.
    ///
    /// After the browser flow completes the backend holds the session;
    /// call [`refresh_profile`](Self::refresh_profile) to pick it up.
    #[must_use]
    pub fn google_login_url(&self) -> Option<String> {
        self.backend.oauth_login_url()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Resolve any previously stored session. Runs once per manager.
    ///
    /// Duplicate and concurrent calls wait for the first run and issue no
    /// further requests.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                if self.credential_present() {
                    tracing::debug!("stored credential found; resolving profile");
                    if let Err(e) = self.refresh_profile().await {
                        tracing::info!(error = %e, "stored session is no longer valid");
                    }
                } else {
                    tracing::debug!("no stored credential; starting unauthenticated");
                    // A login already in flight owns the first resolution.
                    self.transition(|s| {
                        if s.phase == SessionPhase::Unresolved {
                            s.unauthenticated();
                        }
                    });
                }
            })
            .await;
    }

    /// Replace the session with the backend's view of the current user.
    ///
    /// On failure the user and the stored credential are cleared and the
    /// error is returned for callers that want to show it. A credential
    /// saved by a login that started after this request is kept.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn refresh_profile(&self) -> Result<User, AuthError> {
        self.transition(Session::resolving);
        let epoch = self.current_epoch();
        let bearer = self.bearer();

        match self.backend.fetch_profile(bearer.as_deref()).await {
            Ok(user) => {
                tracing::info!(user = %user.id, admin = user.is_admin(), "session resolved");
                self.transition(|s| s.authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile resolution failed; clearing session");
                self.forget_credential_from(epoch);
                self.transition(Session::unauthenticated);
                Err(e)
            }
        }
    }

    /// Log in with email and password, then resolve the profile.
    ///
    /// A token in the response body is persisted before the profile request;
    /// otherwise the backend's cookie carries the session.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection message (or a generic fallback); the
    /// session is left unauthenticated.
    pub async fn login(&self, credentials: Credentials) -> Result<User, AuthError> {
        *self.credential_epoch.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.transition(Session::resolving);

        let response = match self.backend.login(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(email = %credentials.email, error = %e, "login rejected");
                self.transition(Session::unauthenticated);
                return Err(e);
            }
        };

        if let Some(token) = response.token.as_deref() {
            if let Err(e) = self.store.save(token) {
                tracing::error!(error = %e, "could not persist credential token");
                self.transition(Session::unauthenticated);
                return Err(e);
            }
        }

        self.refresh_profile().await
    }

    /// End the session. Always leaves the client unauthenticated.
    ///
    /// The backend call is best-effort; its failure is logged only.
    pub async fn logout(&self) {
        let bearer = self.bearer();
        if let Err(e) = self.backend.logout(bearer.as_deref()).await {
            tracing::warn!(error = %e, "logout request failed; clearing local session anyway");
        }
        self.forget_credential();
        self.transition(Session::unauthenticated);
        tracing::info!("logged out");
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// A registration failure leaves the session untouched. A login failure
    /// after registration is returned as-is; the account still exists.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.backend.register(&registration).await.map_err(|e| {
            tracing::info!(email = %registration.email, error = %e, "registration rejected");
            e
        })?;
        tracing::info!(email = %registration.email, "account registered");
        self.login(registration.credentials()).await
    }

    /// Delete the current account and drop the local session.
    ///
    /// # Errors
    ///
    /// Returns the backend's message; the session is left unchanged.
    pub async fn delete_account(&self) -> Result<(), AuthError> {
        let bearer = self.bearer();
        self.backend.delete_account(bearer.as_deref()).await?;
        self.forget_credential();
        self.transition(Session::unauthenticated);
        tracing::info!("account deleted");
        Ok(())
    }

    /// Rename the current user, then refresh the profile.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the update or the refresh fails.
    pub async fn update_name(&self, name: &str) -> Result<User, AuthError> {
        let bearer = self.bearer();
        self.backend.update_name(bearer.as_deref(), name).await?;
        self.refresh_profile().await
    }

    /// Change the current user's password. Session state is not touched.
    ///
    /// # Errors
    ///
    /// Returns the backend's message, e.g. when the old password is wrong.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), AuthError> {
        let bearer = self.bearer();
        let change = PasswordChange { old_password: old_password.to_owned(), new_password: new_password.to_owned() };
        self.backend.change_password(bearer.as_deref(), &change).await
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Stored bearer token, if any. Never handed to consumers.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "credential store unreadable");
            None
        })
    }

    fn credential_present(&self) -> bool {
        self.bearer().is_some() || self.backend.has_session_cookie()
    }

    fn current_epoch(&self) -> u64 {
        *self.credential_epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `forget_credential` unless a login has started since `epoch`.
    fn forget_credential_from(&self, epoch: u64) {
        let current = self.credential_epoch.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == epoch {
            self.forget_credential();
        } else {
            tracing::debug!("credential replaced by a newer login; keeping it");
        }
    }

    fn forget_credential(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
        self.backend.clear_session_cookie();
    }

    fn transition<F>(&self, apply: F)
    where
        F: FnOnce(&mut Session),
    {
        let _guard = self.transition_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let changed = self.state.send_if_modified(|session| {
            let before = session.clone();
            apply(session);
            *session != before
        });
        if !changed {
            return;
        }

        let snapshot = self.snapshot();
        tracing::trace!(phase = ?snapshot.phase, loading = snapshot.loading, "session transition");

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}
