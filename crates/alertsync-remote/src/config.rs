//! Connection settings for the HTTP backend

use std::fmt;
use std::time::Duration;

/// Collection path of the alert rule provisioning API
pub const DEFAULT_RULES_PATH: &str = "/api/v1/provisioning/alert-rules";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach an alerting backend.
///
/// The token is kept private and never appears in `Debug` output.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    token: Option<String>,
    pub org_id: Option<u64>,
    pub rules_path: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            org_id: None,
            rules_path: DEFAULT_RULES_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_org_id(mut self, org_id: u64) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.rules_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// URL of the rule collection
    pub fn collection_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.rules_path.trim_end_matches('/')
        )
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("rules_path", &self.rules_path)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
