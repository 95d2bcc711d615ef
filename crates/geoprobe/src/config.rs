//! Service configuration for the HTTP layer.

use std::time::Duration;

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dev.virtualearth.net/REST/v1/";

/// User agent for API requests.
pub const USER_AGENT: &str = concat!("geoprobe/", env!("CARGO_PKG_VERSION"));

/// How many times a throttled request is resent by default.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every request made through one
/// [`ServiceClient`](crate::http::ServiceClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Prefix every request path is appended to.
    pub base_url: String,
    /// Appended as the `key` query parameter when set.
    pub api_key: Option<String>,
    pub user_agent: String,
    /// Resends allowed after a throttling response.
    pub max_retries: u32,
    /// Per-attempt timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            user_agent: USER_AGENT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert!(config.base_url.starts_with("https://"));
        assert!(config.api_key.is_none());
        assert!(config.user_agent.starts_with("geoprobe/"));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfig::default()
            .with_base_url("http://127.0.0.1:1234/")
            .with_api_key("abc")
            .with_max_retries(0)
            .with_timeout(None);
        assert_eq!(config.base_url, "http://127.0.0.1:1234/");
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout, None);
    }
}
