//! Auth endpoints consumed by the session lifecycle.
//!
//! `AuthBackend` is the seam between [`SessionManager`] and the network so
//! the lifecycle can run against scripted backends in tests.
//!
//! [`SessionManager`]: crate::state::session::SessionManager

use std::sync::Arc;

use reqwest::Method;

use super::transport::Transport;
use super::types::{Credentials, LoginResponse, PasswordChange, Registration, User};
use crate::error::{AuthError, LOGIN_FAILED};

/// Backend operations the session lifecycle depends on.
///
/// `bearer` is the stored credential token, if any. Cookie-based backends
/// ignore it and rely on the transport's jar.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// `GET /auth/me`
    async fn fetch_profile(&self, bearer: Option<&str>) -> Result<User, AuthError>;

    /// `POST /auth/login`
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;

    /// `POST /auth/logout`
    async fn logout(&self, bearer: Option<&str>) -> Result<(), AuthError>;

    /// `POST /auth/register`
    async fn register(&self, registration: &Registration) -> Result<(), AuthError>;

    /// `DELETE /users/me`
    async fn delete_account(&self, bearer: Option<&str>) -> Result<(), AuthError>;

    /// `PUT /users/me/name`
    async fn update_name(&self, bearer: Option<&str>, name: &str) -> Result<(), AuthError>;

    /// `PUT /auth/me/password`
    async fn change_password(&self, bearer: Option<&str>, change: &PasswordChange) -> Result<(), AuthError>;

    /// Whether a backend-managed session cookie is present.
    fn has_session_cookie(&self) -> bool {
        false
    }

    /// Forget any backend-managed session cookie.
    fn clear_session_cookie(&self) {}

    /// Entry URL of the external OAuth login flow, when supported.
    fn oauth_login_url(&self) -> Option<String> {
        None
    }
}

/// [`AuthBackend`] over the REST API.
#[derive(Clone)]
pub struct HttpBackend {
    transport: Arc<Transport>,
}

impl HttpBackend {
    #[must_use]
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl AuthBackend for HttpBackend {
    async fn fetch_profile(&self, bearer: Option<&str>) -> Result<User, AuthError> {
        let request = self.transport.request(Method::GET, "/auth/me", bearer);
        self.transport.send_json(request).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        let request = self.transport.request(Method::POST, "/auth/login", None).json(credentials);
        let body = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.or_fallback(LOGIN_FAILED))?;

        // Cookie-issuing backends may answer with an empty or non-JSON body.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn logout(&self, bearer: Option<&str>) -> Result<(), AuthError> {
        let request = self.transport.request(Method::POST, "/auth/logout", bearer);
        self.transport.send_empty(request).await
    }

    async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        let request = self.transport.request(Method::POST, "/auth/register", None).json(registration);
        self.transport
            .send_empty(request)
            .await
            .map_err(|e| e.or_fallback("Registration failed"))
    }

    async fn delete_account(&self, bearer: Option<&str>) -> Result<(), AuthError> {
        let request = self.transport.request(Method::DELETE, "/users/me", bearer);
        self.transport
            .send_empty(request)
            .await
            .map_err(|e| e.or_fallback("Failed to delete account"))
    }

    async fn update_name(&self, bearer: Option<&str>, name: &str) -> Result<(), AuthError> {
        let request = self
            .transport
            .request(Method::PUT, "/users/me/name", bearer)
            .json(&serde_json::json!({ "name": name }));
        self.transport
            .send_empty(request)
            .await
            .map_err(|e| e.or_fallback("Failed to update name"))
    }

    async fn change_password(&self, bearer: Option<&str>, change: &PasswordChange) -> Result<(), AuthError> {
        let request = self.transport.request(Method::PUT, "/auth/me/password", bearer).json(change);
        self.transport
            .send_empty(request)
            .await
            .map_err(|e| e.or_fallback("Failed to update password"))
    }

    fn has_session_cookie(&self) -> bool {
        self.transport.has_session_cookie()
    }

    fn clear_session_cookie(&self) {
        self.transport.clear_cookies();
    }

    fn oauth_login_url(&self) -> Option<String> {
        Some(self.transport.url("/oauth2/login/google"))
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
