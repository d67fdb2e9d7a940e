//! Gateway client configuration

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Default gateway host shared by both environments.
pub const DEFAULT_BASE_URL: &str = "https://api.gurutvapay.com";

/// Gateway environment, selecting the path prefix and token cache namespace.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Uat,
    Live,
}

impl Environment {
    /// Path prefix prepended to every gateway endpoint.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Environment::Uat => "/uat_mode",
            Environment::Live => "/live",
        }
    }

    /// Key under which this environment's token is cached.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Environment::Uat => "uat",
            Environment::Live => "live",
        }
    }
}

/// Gateway client configuration
///
/// Construction never fails on missing credentials. Whether an API key or
/// OAuth client credentials are present is checked when an authenticated
/// call is made.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Target environment
    #[serde(default)]
    pub environment: Environment,

    /// Static API key; bypasses token acquisition when set
    pub api_key: Option<SecretString>,

    /// OAuth client id
    pub client_id: Option<String>,

    /// OAuth client secret
    pub client_secret: Option<SecretString>,

    /// Password-grant username used for automatic re-login
    pub username: Option<String>,

    /// Password-grant password used for automatic re-login
    pub password: Option<SecretString>,

    /// Per-attempt HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Seconds before expiry at which a cached token is refreshed
    #[serde(default = "default_stale_buffer_secs")]
    pub stale_buffer_secs: i64,

    /// Gateway root URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding the token cache files
    pub token_cache_dir: Option<PathBuf>,

    /// Shared secret for inbound webhook signatures
    pub webhook_secret: Option<SecretString>,
}

impl GatewayConfig {
    /// Create a configuration for the given environment with defaults.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            api_key: None,
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            stale_buffer_secs: default_stale_buffer_secs(),
            base_url: default_base_url(),
            token_cache_dir: None,
            webhook_secret: None,
        }
    }

    /// Use a static API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Use OAuth client credentials.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set the password-grant credentials used when the cached token is stale.
    pub fn with_password_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the per-attempt timeout, rounded up to whole seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let partial = u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = timeout.as_secs().saturating_add(partial);
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base_ms = backoff_base.as_millis() as u64;
        self
    }

    /// Set the token stale buffer.
    pub fn with_stale_buffer(mut self, buffer: Duration) -> Self {
        self.stale_buffer_secs = buffer.as_secs() as i64;
        self
    }

    /// Override the gateway root URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the directory used by the file token cache.
    pub fn with_token_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_cache_dir = Some(dir.into());
        self
    }

    /// Set the webhook signing secret.
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(SecretString::new(secret.into()));
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Environment-prefixed root that every endpoint hangs off.
    pub fn api_root(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.environment.path_prefix()
        )
    }

    /// Directory for token cache files, defaulting under the system temp dir.
    pub fn cache_dir(&self) -> PathBuf {
        self.token_cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("gurutvapay"))
    }

    /// API key, ignoring an empty value.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
    }

    /// Client id and secret, when both are present and non-empty.
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = self
            .client_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.is_empty())?;
        Some((id, secret))
    }

    /// Password-grant username and password, when both are present.
    pub fn password_credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_ref()?.expose_secret().as_str();
        Some((username, password))
    }

    /// Validate structural values. Credentials are checked at call time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.client_secret.is_some() && self.client_id.is_none() {
            return Err(ValidationError::IncompleteClientCredentials);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_stale_buffer_secs() -> i64 {
    300
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
