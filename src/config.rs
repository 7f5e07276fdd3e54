//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const TOKEN_DIR: &str = "taskclient";
const TOKEN_FILE: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub timeouts: Timeouts,
    /// Explicit token file; the user config directory is used when absent.
    pub token_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Config pointing at `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, timeouts: Timeouts::default(), token_file: None })
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `TASKCLIENT_BASE_URL`: default `http://localhost:8080`
    /// - `TASKCLIENT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TASKCLIENT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `TASKCLIENT_TOKEN_FILE`: default `<config dir>/taskclient/token`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base = lookup("TASKCLIENT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = normalize_base_url(&raw_base)?;
        let timeouts = Timeouts {
            request_secs: parse_or(lookup("TASKCLIENT_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(lookup("TASKCLIENT_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let token_file = lookup("TASKCLIENT_TOKEN_FILE")
            .map(|raw| raw.trim().to_owned())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self { base_url, timeouts, token_file })
    }

    /// Location of the persisted bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error when no explicit file is set and the platform has no
    /// user config directory.
    pub fn token_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.token_file {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(TOKEN_DIR).join(TOKEN_FILE))
            .ok_or(ConfigError::NoTokenPath)
    }

    /// Absolute URL for a backend path such as `/auth/me`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidBaseUrl { value: raw.to_owned(), reason: e.to_string() })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_owned(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
