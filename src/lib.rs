//! # taskclient
//!
//! Client library for the task manager REST backend. Owns the session
//! lifecycle (login, logout, profile refresh, role derivation, token
//! persistence) and wraps the task and admin endpoints the UI consumes.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use taskclient::{AppContext, ClientConfig, Credentials};
//!
//! let ctx = AppContext::from_config(ClientConfig::from_env()?)?;
//! ctx.session.initialize().await;
//! if !ctx.session.is_authenticated() {
//!     ctx.session.login(Credentials::new("a@x.com", "secret")).await?;
//! }
//! let tasks = ctx.tasks().list(false).await?;
//! # let _ = tasks;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod net;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{AuthError, ConfigError};
pub use net::types::{AuthProvider, Credentials, Id, Registration, Task, TaskStatus, User};
pub use state::session::{Session, SessionManager, SessionPhase, SubscriptionId};
pub use state::store::{CredentialStore, FileTokenStore, MemoryTokenStore};
