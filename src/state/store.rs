//! Durable storage for the credential token.
//!
//! Only [`SessionManager`] writes or clears the token; everything else goes
//! through it.
//!
//! [`SessionManager`]: super::session::SessionManager

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::AuthError;

/// Key-value slot holding one opaque bearer token.
pub trait CredentialStore: Send + Sync {
    /// Current token, or `None` when nothing usable is stored.
    fn load(&self) -> Result<Option<String>, AuthError>;

    fn save(&self, token: &str) -> Result<(), AuthError>;

    /// Remove the token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Token persisted in a single file, e.g. `~/.config/taskclient/token`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::storage(&e)),
        }
    }

    /// Writes a sibling temp file (0600 on unix) and renames it over the token.
    fn save(&self, token: &str) -> Result<(), AuthError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| AuthError::storage(&e))?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| AuthError::storage(&e))?;
        file.write_all(token.as_bytes()).map_err(|e| AuthError::storage(&e))?;
        file.as_file().sync_all().map_err(|e| AuthError::storage(&e))?;
        file.persist(&self.path).map_err(|e| AuthError::storage(&e.error))?;

        tracing::debug!(path = %self.path.display(), "credential token saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "credential token removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::storage(&e)),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store; the token lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(Some(token.into())) }
    }
}

impl CredentialStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
