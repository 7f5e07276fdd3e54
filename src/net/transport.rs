//! Shared HTTP transport for the session backend and the task API.
//!
//! ARCHITECTURE
//! ============
//! One `reqwest::Client` per process, configured with the request/connect
//! timeouts and a cookie jar so cookie-issuing backends keep their session
//! across calls. Bearer tokens are attached per request by the caller; the
//! transport never stores them.
//!
//! The jar can be dropped (`clear_cookies`) by rebuilding the client, since
//! reqwest offers no way to evict cookies from a live jar.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, Timeouts};
use crate::error::{AuthError, ConfigError, REQUEST_FAILED, extract_message};

pub struct Transport {
    base_url: Url,
    config: ClientConfig,
    inner: RwLock<Inner>,
}

struct Inner {
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl Inner {
    fn build(timeouts: Timeouts) -> Result<Self, ConfigError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, jar })
    }
}

impl Transport {
    /// Build the transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl { value: config.base_url.clone(), reason: e.to_string() })?;
        let inner = Inner::build(config.timeouts)?;
        Ok(Self { base_url, config, inner: RwLock::new(inner) })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for a backend path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Whether the jar holds any cookie for the backend origin.
    ///
    /// The value is never inspected; presence is the only signal.
    #[must_use]
    pub fn has_session_cookie(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.jar.cookies(&self.base_url).is_some()
    }

    /// Drop every cookie by swapping in a fresh jar and client.
    pub fn clear_cookies(&self) {
        match Inner::build(self.config.timeouts) {
            Ok(fresh) => {
                let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
                *inner = fresh;
                tracing::debug!("session cookies cleared");
            }
            Err(e) => tracing::error!(error = %e, "failed to rebuild HTTP client; cookies retained"),
        }
    }

    /// Start a request to `path`, attaching `bearer` when present.
    pub(crate) fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let http = self.inner.read().unwrap_or_else(PoisonError::into_inner).http.clone();
        let request = http.request(method, self.url(path));
        match bearer {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Send and return the raw success body.
    ///
    /// Non-2xx responses become [`AuthError::Rejected`] with the message
    /// extracted from the body; no response at all becomes
    /// [`AuthError::Transport`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<String, AuthError> {
        let response = request.send().await.map_err(|e| AuthError::transport(&e))?;
        let status = response.status();
        let url = response.url().path().to_owned();
        let body = response.text().await.map_err(|e| AuthError::transport(&e))?;

        if !status.is_success() {
            tracing::debug!(path = %url, status = status.as_u16(), "request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: extract_message(&body, REQUEST_FAILED),
            });
        }

        tracing::trace!(path = %url, status = status.as_u16(), "request succeeded");
        Ok(body)
    }

    /// Send and decode a JSON success body.
    pub(crate) async fn send_json<T>(&self, request: RequestBuilder) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
    {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "unexpected response body");
            AuthError::Transport { message: "The server sent an unexpected response".to_owned() }
        })
    }

    /// Send and discard the success body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), AuthError> {
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
