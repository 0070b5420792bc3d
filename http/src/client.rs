//! Shared reqwest client

use crate::config::HttpConfig;
use crate::error::ConfigError;
use reqwest::{Client, Method, RequestBuilder};

/// reqwest client bound to one backend
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: HttpConfig,
}

impl ApiClient {
    /// Builds a client with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the TLS backend cannot be initialized.
    pub fn new(config: HttpConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Settings this client was built from
    #[must_use]
    pub const fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Absolute URL for `path`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// Request builder with the bearer token applied
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}
