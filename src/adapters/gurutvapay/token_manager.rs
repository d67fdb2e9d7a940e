//! Credential resolution and access token lifecycle.
//!
//! With an API key configured every call simply carries `Bearer <api_key>`.
//! Otherwise a password-grant token is read from the [`TokenCache`] and
//! renewed once it enters the stale window:
//!
//! ```text
//! NoToken ------------> Refreshing --ok--> CachedValid
//! CachedStale --------> Refreshing --err-> error (cache untouched)
//! CachedValid --------> returned as-is, no network call
//! ```
//!
//! The cache is written only after a login response has been fully parsed.

use std::sync::Arc;

use reqwest::header::HeaderValue;
use reqwest::Method;

use super::retry::RetryPolicy;
use crate::config::GatewayConfig;
use crate::domain::{AccessToken, TokenState};
use crate::ports::{
    Clock, GatewayError, GatewayErrorKind, GatewayRequest, HttpTransport, SystemClock, TokenCache,
};

/// Resolves the `Authorization` header for gateway calls.
pub struct TokenManager {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn TokenCache>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    /// Serializes logins within this process.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenManager {
    pub fn new(
        config: Arc<GatewayConfig>,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            config,
            transport,
            cache,
            clock: Arc::new(SystemClock),
            retry,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the wall clock (for deterministic staleness checks).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn cache_key(&self) -> &'static str {
        self.config.environment.cache_key()
    }

    fn login_url(&self) -> String {
        format!("{}/login", self.config.api_root())
    }

    /// Value for the `Authorization` header.
    ///
    /// # Errors
    ///
    /// `Validation` when neither an API key nor client credentials are
    /// configured or the credential is not a valid header value; `Auth`
    /// when an automatic refresh fails.
    pub async fn authorization(&self) -> Result<String, GatewayError> {
        let value = match self.config.api_key() {
            Some(api_key) => format!("Bearer {}", api_key),
            None => format!("Bearer {}", self.access_token().await?.value()),
        };

        if HeaderValue::from_str(&value).is_err() {
            return Err(GatewayError::validation(
                "Credential contains characters not allowed in an HTTP header",
            ));
        }
        Ok(value)
    }

    /// Current token state for this environment.
    pub async fn state(&self) -> TokenState {
        if self.refresh_lock.try_lock().is_err() {
            return TokenState::Refreshing;
        }
        let cached = self.cache.get(self.cache_key()).await.ok().flatten();
        TokenState::classify(
            cached.as_ref(),
            self.clock.now(),
            self.config.stale_buffer_secs,
        )
    }

    /// A non-stale access token, logging in again when needed.
    pub async fn access_token(&self) -> Result<AccessToken, GatewayError> {
        if self.config.client_credentials().is_none() {
            return Err(GatewayError::validation(
                "No API key or client credentials configured",
            ));
        }

        if let Some(token) = self.cached_valid().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while this one waited
        if let Some(token) = self.cached_valid().await {
            return Ok(token);
        }

        let (username, password) = self.config.password_credentials().ok_or_else(|| {
            GatewayError::auth("Access token missing or stale and no password credentials configured")
        })?;

        tracing::info!(environment = self.cache_key(), "Refreshing gateway access token");
        self.login_locked(username, password)
            .await
            .map_err(refresh_failed)
    }

    /// Exchange credentials for a token and persist it.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, GatewayError> {
        let _guard = self.refresh_lock.lock().await;
        self.login_locked(username, password).await
    }

    async fn cached_valid(&self) -> Option<AccessToken> {
        let cached = match self.cache.get(self.cache_key()).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, "Token cache read failed");
                return None;
            }
        };

        let state = TokenState::classify(
            cached.as_ref(),
            self.clock.now(),
            self.config.stale_buffer_secs,
        );
        if state.needs_refresh() {
            tracing::debug!(state = ?state, "Cached token unusable");
            return None;
        }

        tracing::debug!("Using cached access token");
        cached
    }

    /// Caller must hold `refresh_lock`.
    async fn login_locked(&self, username: &str, password: &str) -> Result<AccessToken, GatewayError> {
        if username.is_empty() || password.is_empty() {
            return Err(GatewayError::validation("Username and password are required"));
        }
        let (client_id, client_secret) = self.config.client_credentials().ok_or_else(|| {
            GatewayError::validation("client_id and client_secret are required for login")
        })?;

        let request = GatewayRequest::new(Method::POST, self.login_url()).with_form(vec![
            ("grant_type".to_string(), "password".to_string()),
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
            ("client_id".to_string(), client_id.to_string()),
            ("client_secret".to_string(), client_secret.to_string()),
        ]);

        let body = self
            .retry
            .execute(|| self.transport.send(&request))
            .await?;

        let token = AccessToken::from_login_response(&body, self.clock.now()).ok_or_else(|| {
            tracing::warn!("Login response did not contain an access token");
            GatewayError::auth("Login response missing access_token")
        })?;

        if let Err(e) = self.cache.put_atomic(self.cache_key(), &token).await {
            tracing::warn!(error = %e, "Failed to persist access token");
        }

        tracing::info!(
            environment = self.cache_key(),
            expires_at = token.expires_at(),
            "Gateway access token acquired"
        );
        Ok(token)
    }
}

/// A failed automatic refresh is an auth failure, whatever the login hit.
fn refresh_failed(error: GatewayError) -> GatewayError {
    if error.kind == GatewayErrorKind::Auth {
        return error;
    }
    tracing::warn!(kind = %error.kind, status = error.status, "Access token refresh failed");
    GatewayError {
        kind: GatewayErrorKind::Auth,
        message: format!("Access token refresh failed: {}", error),
        ..error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gurutvapay::MockTransport;
    use crate::adapters::storage::InMemoryTokenCache;
    use crate::config::Environment;
    use crate::ports::RequestBody;
    use serde_json::json;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;
    const BUFFER: i64 = 300;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    fn oauth_config() -> GatewayConfig {
        GatewayConfig::new(Environment::Uat)
            .with_base_url("http://gateway.test")
            .with_client_credentials("cid", "csecret")
            .with_password_credentials("merchant", "pw")
            .with_backoff_base(Duration::from_millis(1))
    }

    fn manager(
        config: GatewayConfig,
        transport: &MockTransport,
        cache: &InMemoryTokenCache,
    ) -> TokenManager {
        TokenManager::new(
            Arc::new(config),
            Arc::new(transport.clone()),
            Arc::new(cache.clone()),
        )
        .with_clock(Arc::new(FixedClock(NOW)))
    }

    fn form_value<'a>(request: &'a GatewayRequest, name: &str) -> Option<&'a str> {
        match &request.body {
            RequestBody::Form(fields) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn api_key_bypasses_token_flow() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let config = GatewayConfig::new(Environment::Live).with_api_key("key_123");
        let tokens = manager(config, &transport, &cache);

        assert_eq!(tokens.authorization().await.unwrap(), "Bearer key_123");
        assert_eq!(transport.call_count(), 0);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_credentials_is_validation_error_without_network() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let tokens = manager(GatewayConfig::new(Environment::Uat), &transport, &cache);

        let err = tokens.authorization().await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Validation);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_cached_token_makes_no_network_call() {
        let transport = MockTransport::new();
        let cache =
            InMemoryTokenCache::with_token("uat", AccessToken::new("cached", NOW + BUFFER + 1));
        let tokens = manager(oauth_config(), &transport, &cache);

        assert_eq!(tokens.authorization().await.unwrap(), "Bearer cached");
        assert_eq!(transport.call_count(), 0);
        assert_eq!(tokens.state().await, TokenState::CachedValid);
    }

    #[tokio::test]
    async fn stale_cached_token_triggers_login() {
        let transport = MockTransport::new();
        transport.push_success(json!({"access_token": "fresh", "expires_in": 3600}));
        let cache =
            InMemoryTokenCache::with_token("uat", AccessToken::new("old", NOW + BUFFER - 1));
        let tokens = manager(oauth_config(), &transport, &cache);
        assert_eq!(tokens.state().await, TokenState::CachedStale);

        assert_eq!(tokens.authorization().await.unwrap(), "Bearer fresh");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, "http://gateway.test/uat_mode/login");
        assert!(requests[0].header("Authorization").is_none());
        assert_eq!(form_value(&requests[0], "grant_type"), Some("password"));
        assert_eq!(form_value(&requests[0], "username"), Some("merchant"));
        assert_eq!(form_value(&requests[0], "client_id"), Some("cid"));

        let stored = cache.get("uat").await.unwrap().unwrap();
        assert_eq!(stored, AccessToken::new("fresh", NOW + 3600));
    }

    #[tokio::test]
    async fn no_token_triggers_login() {
        let transport = MockTransport::new();
        transport.push_success(json!({"access_token": "first"}));
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);
        assert_eq!(tokens.state().await, TokenState::NoToken);

        let token = tokens.access_token().await.unwrap();

        assert_eq!(token.value(), "first");
        // No expiry in the response: conservative fallback
        assert_eq!(token.expires_at(), NOW + crate::domain::FALLBACK_TTL_SECS);
        assert_eq!(cache.write_count(), 1);
    }

    #[tokio::test]
    async fn login_response_without_token_is_auth_error_and_not_cached() {
        let transport = MockTransport::new();
        transport.push_success(json!({"message": "ok"}));
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);

        let err = tokens.login("merchant", "pw").await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Auth);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn rejected_login_is_auth_error_and_not_cached() {
        let transport = MockTransport::new();
        transport.push_status(401, r#"{"detail":"bad credentials"}"#);
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);

        let err = tokens.login("merchant", "wrong").await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Auth);
        assert_eq!(err.status, Some(401));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn login_retries_transient_failures() {
        let transport = MockTransport::new();
        transport.push_status(503, "");
        transport.push_success(json!({"access_token": "t", "expires_at": NOW + 900}));
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);

        let token = tokens.login("merchant", "pw").await.unwrap();

        assert_eq!(token.expires_at(), NOW + 900);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn login_requires_client_credentials() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let tokens = manager(GatewayConfig::new(Environment::Uat), &transport, &cache);

        let err = tokens.login("merchant", "pw").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Validation);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn login_rejects_empty_username() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);

        let err = tokens.login("", "pw").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Validation);
    }

    #[tokio::test]
    async fn stale_token_without_password_credentials_is_auth_error() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::with_token("uat", AccessToken::new("old", NOW));
        let config = GatewayConfig::new(Environment::Uat).with_client_credentials("cid", "cs");
        let tokens = manager(config, &transport, &cache);

        let err = tokens.authorization().await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Auth);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn environments_use_separate_cache_entries() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::with_token("uat", AccessToken::new("uat-token", NOW + 10_000));
        let config = oauth_config();
        let live = GatewayConfig {
            environment: Environment::Live,
            ..config
        };
        transport.push_success(json!({"access_token": "live-token"}));
        let tokens = manager(live, &transport, &cache);

        assert_eq!(tokens.authorization().await.unwrap(), "Bearer live-token");
        assert_eq!(transport.requests()[0].url, "http://gateway.test/live/login");
        assert_eq!(cache.get("uat").await.unwrap().unwrap().value(), "uat-token");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_login() {
        let transport = MockTransport::new();
        transport.push_success(json!({"access_token": "shared", "expires_in": 3600}));
        let cache = InMemoryTokenCache::new();
        let tokens = Arc::new(manager(oauth_config(), &transport, &cache));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tokens = Arc::clone(&tokens);
            handles.push(tokio::spawn(async move { tokens.authorization().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "Bearer shared");
        }

        assert_eq!(transport.call_count(), 1);
        assert_eq!(cache.write_count(), 1);
    }

    #[tokio::test]
    async fn refresh_exhausting_retries_is_auth_error_with_status() {
        let transport = MockTransport::new();
        for _ in 0..4 {
            transport.push_status(503, "unavailable");
        }
        let cache = InMemoryTokenCache::new();
        let tokens = manager(oauth_config(), &transport, &cache);

        let err = tokens.authorization().await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Auth);
        assert_eq!(err.status, Some(503));
        assert_eq!(err.body.as_deref(), Some("unavailable"));
        assert_eq!(transport.call_count(), 4);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn refresh_network_failure_is_auth_error() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let config = GatewayConfig {
            max_retries: 0,
            ..oauth_config()
        };
        let tokens = manager(config, &transport, &cache);

        let err = tokens.access_token().await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Auth);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn explicit_login_keeps_original_error_kind() {
        let transport = MockTransport::new();
        transport.push_status(500, "boom");
        let cache = InMemoryTokenCache::new();
        let config = GatewayConfig {
            max_retries: 0,
            ..oauth_config()
        };
        let tokens = manager(config, &transport, &cache);

        let err = tokens.login("merchant", "pw").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Gateway);
    }

    #[tokio::test]
    async fn api_key_with_control_characters_is_rejected_before_sending() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::new();
        let config = GatewayConfig::new(Environment::Uat).with_api_key("bad\nkey");
        let tokens = manager(config, &transport, &cache);

        let err = tokens.authorization().await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Validation);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn token_with_control_characters_is_rejected() {
        let transport = MockTransport::new();
        let cache = InMemoryTokenCache::with_token(
            "uat",
            AccessToken::new("tok\r\nX-Injected: 1", NOW + 10_000),
        );
        let tokens = manager(oauth_config(), &transport, &cache);

        let err = tokens.authorization().await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Validation);
        assert_eq!(transport.call_count(), 0);
    }
}
