//! Transport configuration and its resolution from options and environment.

use crate::error::Error;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "AI_RELAY_API_KEY";
/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "AI_RELAY_BASE_URL";

/// Resolved, validated settings every request is sent with.
///
/// Immutable once built; the client shares it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub(crate) base_url: String,
    pub(crate) api_key: SecretString,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
}

impl TransportConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.ai-relay.dev/v1";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Absolute URL for a server-relative path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Unresolved settings as given to the builder.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConfigOptions {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl ConfigOptions {
    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<TransportConfig, Error> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with a custom variable lookup. Explicit options win over the
    /// environment, which wins over defaults.
    pub fn resolve_with<F>(self, lookup: F) -> Result<TransportConfig, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = self
            .api_key
            .or_else(|| lookup(API_KEY_ENV))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "missing API key: pass one to the builder or set {API_KEY_ENV}"
                ))
            })?;
        if api_key.chars().any(|c| c.is_control()) {
            return Err(Error::config("API key contains control characters"));
        }

        let base_url = self
            .base_url
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(|| TransportConfig::DEFAULT_BASE_URL.to_string());
        let base_url = validate_base_url(&base_url)?;

        let timeout = self.timeout.unwrap_or(TransportConfig::DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }

        Ok(TransportConfig {
            base_url,
            api_key: SecretString::new(api_key),
            timeout,
            max_retries: self
                .max_retries
                .unwrap_or(TransportConfig::DEFAULT_MAX_RETRIES),
        })
    }
}

/// Require HTTPS, allowing plain HTTP only for the loopback host.
fn validate_base_url(raw: &str) -> Result<String, Error> {
    let url = Url::parse(raw).map_err(|e| Error::config(format!("invalid base URL {raw:?}: {e}")))?;

    match url.scheme() {
        "https" => {}
        "http" if matches!(url.host_str(), Some("localhost" | "127.0.0.1")) => {}
        scheme => {
            return Err(Error::config(format!(
                "base URL must use https (http is allowed for localhost only), got {scheme}://"
            )))
        }
    }

    Ok(raw.trim_end_matches('/').to_string())
}
