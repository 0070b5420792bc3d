//! Connection settings for the allocation backend

use crate::error::ConfigError;
use std::time::Duration;

/// Base URL variable
pub const ENV_API_URL: &str = "ALLOCATION_API_URL";
/// Bearer token variable
pub const ENV_API_TOKEN: &str = "ALLOCATION_API_TOKEN";
/// Per-request timeout variable, in whole seconds
pub const ENV_TIMEOUT_SECS: &str = "ALLOCATION_HTTP_TIMEOUT_SECS";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Bearer token sent with every request, if any
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpConfig {
    /// Creates a config with no token and the default timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `ALLOCATION_API_URL` (required)
    /// - `ALLOCATION_API_TOKEN` (optional)
    /// - `ALLOCATION_HTTP_TIMEOUT_SECS` (default: 30)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the URL is unset and
    /// [`ConfigError::Invalid`] when the timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`HttpConfig::from_env`] with a custom lookup (for tests).
    ///
    /// # Errors
    ///
    /// See [`HttpConfig::from_env`].
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = get_env(ENV_API_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_API_URL))?;
        let mut config = Self::new(base_url.trim());

        if let Some(token) = get_env(ENV_API_TOKEN).filter(|token| !token.trim().is_empty()) {
            config.token = Some(token.trim().to_string());
        }

        if let Some(raw) = get_env(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn url_is_required() {
        assert_eq!(
            HttpConfig::from_env_with(lookup(&[])),
            Err(ConfigError::Missing(ENV_API_URL))
        );
        assert_eq!(
            HttpConfig::from_env_with(lookup(&[(ENV_API_URL, "  ")])),
            Err(ConfigError::Missing(ENV_API_URL))
        );
    }

    #[test]
    fn reads_every_variable() {
        let config = HttpConfig::from_env_with(lookup(&[
            (ENV_API_URL, "https://fleet.example.com/api/"),
            (ENV_API_TOKEN, "secret"),
            (ENV_TIMEOUT_SECS, "5"),
        ]));

        assert_eq!(
            config,
            Ok(HttpConfig::new("https://fleet.example.com/api")
                .with_token("secret")
                .with_timeout(Duration::from_secs(5)))
        );
    }

    #[test]
    fn rejects_a_zero_timeout() {
        let config = HttpConfig::from_env_with(lookup(&[
            (ENV_API_URL, "http://localhost"),
            (ENV_TIMEOUT_SECS, "0"),
        ]));
        assert!(matches!(config, Err(ConfigError::Invalid { var, .. }) if var == ENV_TIMEOUT_SECS));
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = HttpConfig::from_env_with(lookup(&[(ENV_API_URL, "http://localhost")]));
        assert_eq!(config, Ok(HttpConfig::new("http://localhost")));
        assert_eq!(HttpConfig::new("http://localhost").timeout, DEFAULT_TIMEOUT);
    }
}
