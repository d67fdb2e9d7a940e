//! GurutvaPay gateway client.
//!
//! Implements the `PaymentGateway` port over an `HttpTransport`. Every
//! authenticated call resolves its `Authorization` header through the
//! [`TokenManager`] and then runs under the [`RetryPolicy`].
//!
//! # Configuration
//!
//! ```ignore
//! let config = GatewayConfig::new(Environment::Uat)
//!     .with_client_credentials(client_id, client_secret)
//!     .with_password_credentials(username, password);
//! let client = GurutvapayClient::new(config)?;
//! let initiation = client.create_payment(&order).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

use super::retry::RetryPolicy;
use super::token_manager::TokenManager;
use super::transport::ReqwestTransport;
use super::webhook::WebhookVerifier;
use crate::adapters::storage::FileTokenCache;
use crate::config::GatewayConfig;
use crate::domain::{AccessToken, PaymentInitiation, PaymentOrder};
use crate::ports::{
    ApiRequest, Clock, GatewayError, GatewayRequest, HttpTransport, PaymentGateway, TokenCache,
};

/// Client for the GurutvaPay HTTP API.
pub struct GurutvapayClient {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenManager,
    retry: RetryPolicy,
}

impl GurutvapayClient {
    /// Build a client with the reqwest transport and the file token cache.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed configuration, `Transport` when the HTTP
    /// client cannot be created.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::validation(e.to_string()))?;

        let transport = ReqwestTransport::new(config.timeout())?;
        let cache = FileTokenCache::new(config.cache_dir());
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(cache)))
    }

    /// Build a client from explicit transport and cache implementations.
    pub fn with_parts(
        config: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        let config = Arc::new(config);
        let tokens = TokenManager::new(Arc::clone(&config), Arc::clone(&transport), cache);
        let retry = RetryPolicy::from_config(&config);
        Self {
            config,
            transport,
            tokens,
            retry,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Verifier for inbound webhooks, when a webhook secret is configured.
    pub fn webhook_verifier(&self) -> Option<WebhookVerifier> {
        self.config
            .webhook_secret
            .clone()
            .map(WebhookVerifier::from_secret)
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.api_root(),
            path.trim_start_matches('/')
        )
    }

    async fn call(&self, request: GatewayRequest) -> Result<Value, GatewayError> {
        let authorization = self.tokens.authorization().await?;
        let request = request.with_header(AUTHORIZATION.as_str(), authorization);

        let result = self
            .retry
            .execute(|| self.transport.send(&request))
            .await;

        match &result {
            Ok(_) => tracing::debug!(method = %request.method, url = %request.url, "Gateway call succeeded"),
            Err(e) => tracing::warn!(
                method = %request.method,
                url = %request.url,
                kind = %e.kind,
                status = e.status,
                "Gateway call failed"
            ),
        }
        result
    }
}

#[async_trait]
impl PaymentGateway for GurutvapayClient {
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, GatewayError> {
        self.tokens.login(username, password).await
    }

    async fn create_payment(
        &self,
        order: &PaymentOrder,
    ) -> Result<PaymentInitiation, GatewayError> {
        if order.merchant_order_id.is_empty() {
            return Err(GatewayError::validation("merchantOrderId is required"));
        }
        if !order.amount.is_finite() {
            return Err(GatewayError::validation("amount must be a finite number"));
        }

        let body = serde_json::to_value(order)
            .map_err(|e| GatewayError::validation(format!("Invalid payment order: {}", e)))?;

        let request = GatewayRequest::new(Method::POST, self.endpoint("initiate-payment"))
            .with_json(body);
        let raw = self.call(request).await?;

        let initiation = PaymentInitiation::from(raw);
        tracing::info!(
            merchant_order_id = %order.merchant_order_id,
            status = initiation.status.as_deref().unwrap_or("unknown"),
            "Payment initiated"
        );
        Ok(initiation)
    }

    async fn transaction_status(&self, merchant_order_id: &str) -> Result<Value, GatewayError> {
        if merchant_order_id.is_empty() {
            return Err(GatewayError::validation("merchantOrderId is required"));
        }

        let request = GatewayRequest::new(Method::POST, self.endpoint("transaction-status"))
            .with_form(vec![(
                "merchantOrderId".to_string(),
                merchant_order_id.to_string(),
            )]);
        self.call(request).await
    }

    async fn transaction_list(&self, limit: u32, offset: u32) -> Result<Value, GatewayError> {
        let request = GatewayRequest::new(Method::GET, self.endpoint("transaction-list"))
            .with_query(vec![
                ("limit".to_string(), limit.to_string()),
                ("page".to_string(), offset.to_string()),
            ]);
        self.call(request).await
    }

    async fn request(&self, request: ApiRequest) -> Result<Value, GatewayError> {
        if request.path.is_empty() {
            return Err(GatewayError::validation("Request path is required"));
        }

        let mut outgoing = GatewayRequest::new(request.method, self.endpoint(&request.path))
            .with_query(request.query);

        for (name, value) in request.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(GatewayError::validation(format!("Invalid header name: {}", name)));
            }
            if HeaderValue::from_str(&value).is_err() {
                return Err(GatewayError::validation(format!(
                    "Invalid value for header {}",
                    name
                )));
            }
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                tracing::debug!("Ignoring caller-supplied Authorization header");
                continue;
            }
            outgoing = outgoing.with_header(name, value);
        }

        outgoing = match (request.form, request.json) {
            (Some(_), Some(_)) => {
                return Err(GatewayError::validation(
                    "A request cannot carry both a form and a JSON body",
                ))
            }
            (Some(fields), None) => outgoing.with_form(fields),
            (None, Some(body)) => outgoing.with_json(body),
            (None, None) => outgoing,
        };

        self.call(outgoing).await
    }
}
