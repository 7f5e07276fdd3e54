//! Explicitly constructed application context.
//!
//! The entry point builds one `AppContext`, calls
//! [`SessionManager::initialize`] on it, and hands clones of the inner
//! `Arc`s to whatever needs them.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::net::backend::HttpBackend;
use crate::net::tasks::TaskClient;
use crate::net::transport::Transport;
use crate::state::session::SessionManager;
use crate::state::store::{CredentialStore, FileTokenStore};

#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionManager>,
    transport: Arc<Transport>,
}

impl AppContext {
    /// Context persisting the token at the configured token path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or no token path
    /// can be determined.
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(FileTokenStore::new(config.token_path()?));
        Self::with_store(config, store)
    }

    /// Context over a caller-supplied credential store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        let transport = Arc::new(Transport::new(config)?);
        let backend = Arc::new(HttpBackend::new(Arc::clone(&transport)));
        let session = Arc::new(SessionManager::new(backend, store));
        tracing::debug!(base_url = %transport.config().base_url, "client context ready");
        Ok(Self { session, transport })
    }

    #[must_use]
    pub fn tasks(&self) -> TaskClient {
        TaskClient::new(Arc::clone(&self.transport), Arc::clone(&self.session))
    }
}
