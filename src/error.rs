//! Error types surfaced to callers of the session and task APIs.
//!
//! Every failure is normalized to a single display message. Views show
//! [`AuthError::message`] directly; the variant only tells them where the
//! failure came from.

/// Fallback when a login rejection carries no readable body.
pub const LOGIN_FAILED: &str = "Login failed";
/// Fallback when any other request fails without a readable body.
pub const REQUEST_FAILED: &str = "Request failed";
/// Message used when the backend could not be reached at all.
pub const NETWORK_UNAVAILABLE: &str = "Unable to reach the server";

/// Normalized error returned by every public session/task operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// No usable response (connect failure, timeout, undecodable body).
    #[error("{message}")]
    Transport { message: String },

    /// The credential store could not be read or written.
    #[error("{message}")]
    Storage { message: String },

    /// The current session lacks the role required for the operation.
    #[error("{message}")]
    Forbidden { message: String },
}

impl AuthError {
    /// Human-readable message suitable for direct display.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. }
            | Self::Transport { message }
            | Self::Storage { message }
            | Self::Forbidden { message } => message,
        }
    }

    /// HTTP status for backend rejections.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(error: &reqwest::Error) -> Self {
        tracing::debug!(error = %error, "request failed without a response");
        let message = if error.is_timeout() {
            "The server took too long to respond".to_owned()
        } else {
            NETWORK_UNAVAILABLE.to_owned()
        };
        Self::Transport { message }
    }

    pub(crate) fn storage(error: &std::io::Error) -> Self {
        Self::Storage { message: format!("credential storage failed: {error}") }
    }

    /// Replace the message with `fallback` when the backend gave none.
    ///
    /// Only rejections with the generic [`REQUEST_FAILED`] text are touched.
    #[must_use]
    pub(crate) fn or_fallback(self, fallback: &str) -> Self {
        match self {
            Self::Rejected { status, message } if message == REQUEST_FAILED => {
                Self::Rejected { status, message: fallback.to_owned() }
            }
            other => other,
        }
    }
}

/// Extract a display message from an error response body.
///
/// Prefers a JSON `message` field, then `error`, then a non-empty plain text
/// body, then `fallback`.
#[must_use]
pub fn extract_message(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_owned();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback)
            .to_owned(),
        Err(_) if trimmed.starts_with('<') => fallback.to_owned(),
        Err(_) => trimmed.to_owned(),
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{value}`: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("no token file configured and no user config directory available")]
    NoTokenPath,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
