//! Client configuration.

use std::time::Duration;

use crate::auth::Credentials;
use crate::resource::Locator;

/// Everything needed to connect to a BadgeKit API server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Upper bound for one request, connect and body read included.
    pub timeout: Duration,
    /// Signing credentials; `None` sends unsigned requests.
    pub credentials: Option<Credentials>,
    /// Default locator components, e.g. the badge system to work in.
    pub defaults: Locator,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            credentials: None,
            defaults: Locator::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(secret));
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_defaults(mut self, defaults: Locator) -> Self {
        self.defaults = defaults;
        self
    }
}
