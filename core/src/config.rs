//! Session configuration.
//!
//! Defaults work out of the box; [`SessionConfig::from_env`] lets a
//! deployment override them without code changes and rejects values it
//! cannot parse.

use crate::error::ConfigError;
use crate::types::VehicleStatus;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable overriding the default remark
pub const ENV_DEFAULT_REMARK: &str = "ALLOCATION_DEFAULT_REMARK";
/// Environment variable holding the search debounce in milliseconds
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "ALLOCATION_SEARCH_DEBOUNCE_MS";

/// Remark sent when the user leaves the remarks field blank
pub const DEFAULT_REMARK: &str = "Vehicle allocation";

/// Tunables for one allocation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Remark used when the user's remarks are blank
    pub default_remark: String,
    /// Quiet period before a vehicle search is sent; zero sends immediately
    pub search_debounce: Duration,
    /// Status filter applied when a search does not name one
    pub default_status_filter: Option<VehicleStatus>,
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ALLOCATION_DEFAULT_REMARK` (default: `Vehicle allocation`, also used when blank)
    /// - `ALLOCATION_SEARCH_DEBOUNCE_MS` (default: 300)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the debounce is not a
    /// non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] with a custom lookup.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::from_env`].
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_remark = get_env(ENV_DEFAULT_REMARK)
            .map(|remark| remark.trim().to_string())
            .filter(|remark| !remark.is_empty())
            .unwrap_or(defaults.default_remark);

        let search_debounce = match get_env(ENV_SEARCH_DEBOUNCE_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    var: ENV_SEARCH_DEBOUNCE_MS,
                    value: raw,
                })?,
            None => defaults.search_debounce,
        };

        Ok(Self {
            default_remark,
            search_debounce,
            default_status_filter: defaults.default_status_filter,
        })
    }

    /// Set the default remark
    #[must_use]
    pub fn with_default_remark(mut self, remark: impl Into<String>) -> Self {
        self.default_remark = remark.into();
        self
    }

    /// Set the search debounce
    #[must_use]
    pub const fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Set the status filter used when a search names none
    #[must_use]
    pub const fn with_default_status_filter(mut self, status: Option<VehicleStatus>) -> Self {
        self.default_status_filter = status;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_remark: DEFAULT_REMARK.to_string(),
            search_debounce: Duration::from_millis(300),
            default_status_filter: Some(VehicleStatus::Active),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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
    fn unset_environment_gives_defaults() {
        assert_eq!(SessionConfig::from_env_with(lookup(&[])), Ok(SessionConfig::default()));
    }

    #[test]
    fn environment_overrides_remark_and_debounce() {
        let config = SessionConfig::from_env_with(lookup(&[
            (ENV_DEFAULT_REMARK, " Shuttle "),
            (ENV_SEARCH_DEBOUNCE_MS, "0"),
        ]))
        .unwrap();

        assert_eq!(config.default_remark, "Shuttle");
        assert_eq!(config.search_debounce, Duration::ZERO);
    }

    #[test]
    fn blank_remark_keeps_the_default() {
        let config = SessionConfig::from_env_with(lookup(&[(ENV_DEFAULT_REMARK, "   ")])).unwrap();
        assert_eq!(config.default_remark, DEFAULT_REMARK);
    }

    #[test]
    fn unparseable_debounce_is_rejected() {
        for raw in ["fast", "-5", "1.5"] {
            assert_eq!(
                SessionConfig::from_env_with(lookup(&[(ENV_SEARCH_DEBOUNCE_MS, raw)])),
                Err(ConfigError::Invalid {
                    var: ENV_SEARCH_DEBOUNCE_MS,
                    value: raw.to_string(),
                })
            );
        }
    }

    #[test]
    fn builders_override_defaults() {
        let config = SessionConfig::default()
            .with_default_remark("Shuttle")
            .with_search_debounce(Duration::ZERO)
            .with_default_status_filter(None);

        assert_eq!(config.default_remark, "Shuttle");
        assert_eq!(config.search_debounce, Duration::ZERO);
        assert_eq!(config.default_status_filter, None);
    }

    #[test]
    fn defaults_search_active_vehicles() {
        let config = SessionConfig::default();
        assert_eq!(config.default_status_filter, Some(VehicleStatus::Active));
        assert_eq!(config.default_remark, DEFAULT_REMARK);
    }
}
