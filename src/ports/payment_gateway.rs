//! Payment gateway port.
//!
//! Defines the contract the gateway client exposes to embedding applications,
//! together with the error taxonomy every operation reports through.
//!
//! # Design
//!
//! - **Typed failures**: every non-2xx outcome maps to one [`GatewayErrorKind`]
//! - **No partial success**: an operation returns either the decoded body or an error
//! - **Diagnostics without leaks**: raw bodies are truncated and never logged

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AccessToken, Failure, FailureKind, PaymentInitiation, PaymentOrder};

/// Longest raw body kept on an error.
pub const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange password-grant credentials for an access token and cache it.
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, GatewayError>;

    /// Start a hosted checkout for an order.
    async fn create_payment(&self, order: &PaymentOrder)
        -> Result<PaymentInitiation, GatewayError>;

    /// Look up the state of a single order.
    async fn transaction_status(&self, merchant_order_id: &str) -> Result<Value, GatewayError>;

    /// Page through recent transactions.
    async fn transaction_list(&self, limit: u32, offset: u32) -> Result<Value, GatewayError>;

    /// Authenticated call to an arbitrary endpoint.
    async fn request(&self, request: ApiRequest) -> Result<Value, GatewayError>;
}

/// Generic authenticated request.
///
/// `path` is either an absolute `http(s)://` URL or a path resolved against
/// the environment-prefixed API root.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            form: None,
            json: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error kind for categorization.
    pub kind: GatewayErrorKind,

    /// Human-readable message.
    pub message: String,

    /// HTTP status, when a response was received.
    pub status: Option<u16>,

    /// Truncated raw response body, when one was received.
    pub body: Option<String>,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Attach the HTTP status and raw body.
    pub fn with_response(mut self, status: u16, body: &str) -> Self {
        self.status = Some(status);
        self.body = Some(truncate_body(body));
        self
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Validation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message)
    }

    /// Map a terminal failed attempt onto the taxonomy.
    pub fn from_failure(failure: &Failure) -> Self {
        let status = failure.status;
        let body = failure.raw_body.as_str();

        match failure.kind {
            FailureKind::Transient if failure.is_network() => {
                Self::transport("network error or timeout")
            }
            FailureKind::Transient if status == 429 => {
                Self::new(GatewayErrorKind::RateLimited, "rate limit exceeded")
                    .with_response(status, body)
            }
            FailureKind::Transient => {
                Self::new(GatewayErrorKind::Gateway, format!("gateway error {}", status))
                    .with_response(status, body)
            }
            FailureKind::Auth => {
                Self::auth(format!("gateway rejected credentials ({})", status))
                    .with_response(status, body)
            }
            FailureKind::NotFound => {
                Self::new(GatewayErrorKind::NotFound, "resource not found")
                    .with_response(status, body)
            }
            FailureKind::Permanent if (200..300).contains(&status) => {
                Self::transport("response body is not valid JSON").with_response(status, body)
            }
            FailureKind::Permanent => {
                Self::new(GatewayErrorKind::Gateway, format!("gateway error {}", status))
                    .with_response(status, body)
            }
        }
    }

    /// Whether an outer caller may reasonably try again later.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// 401/403, or a login response without an access token.
    Auth,

    /// 404.
    NotFound,

    /// 429 after the retry budget ran out.
    RateLimited,

    /// Missing credentials or malformed request input.
    Validation,

    /// Network failure, timeout, or a 2xx body that is not JSON.
    Transport,

    /// Any other non-2xx response.
    Gateway,
}

impl GatewayErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorKind::RateLimited | GatewayErrorKind::Transport
        )
    }
}

impl std::fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorKind::Auth => "auth_error",
            GatewayErrorKind::NotFound => "not_found",
            GatewayErrorKind::RateLimited => "rate_limited",
            GatewayErrorKind::Validation => "validation_error",
            GatewayErrorKind::Transport => "transport_error",
            GatewayErrorKind::Gateway => "gateway_error",
        };
        write!(f, "{}", s)
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn failure_mapping_preserves_status_and_body() {
        let cases = [
            (401, GatewayErrorKind::Auth),
            (403, GatewayErrorKind::Auth),
            (404, GatewayErrorKind::NotFound),
            (429, GatewayErrorKind::RateLimited),
            (500, GatewayErrorKind::Gateway),
            (400, GatewayErrorKind::Gateway),
        ];

        for (status, kind) in cases {
            let err = GatewayError::from_failure(&Failure::from_status(status, "{\"e\":1}"));
            assert_eq!(err.kind, kind, "status {}", status);
            assert_eq!(err.status, Some(status));
            assert_eq!(err.body.as_deref(), Some("{\"e\":1}"));
        }
    }

    #[test]
    fn network_failure_maps_to_transport_without_status() {
        let err = GatewayError::from_failure(&Failure::network());
        assert_eq!(err.kind, GatewayErrorKind::Transport);
        assert!(err.status.is_none());
    }

    #[test]
    fn undecodable_success_maps_to_transport() {
        let err = GatewayError::from_failure(&Failure::undecodable(200, "not json"));
        assert_eq!(err.kind, GatewayErrorKind::Transport);
        assert_eq!(err.status, Some(200));
        assert_eq!(err.body.as_deref(), Some("not json"));
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        let err = GatewayError::new(GatewayErrorKind::Gateway, "x").with_response(500, &body);
        assert_eq!(err.body.unwrap().chars().count(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn retryable_kinds() {
        assert!(GatewayErrorKind::RateLimited.is_retryable());
        assert!(GatewayErrorKind::Transport.is_retryable());
        assert!(!GatewayErrorKind::Auth.is_retryable());
        assert!(!GatewayErrorKind::Validation.is_retryable());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = GatewayError::auth("login response missing access_token");
        let text = err.to_string();
        assert!(text.contains("auth_error"));
        assert!(text.contains("missing access_token"));
    }

    #[test]
    fn api_request_builder_collects_parts() {
        let request = ApiRequest::post("/refund")
            .header("Idempotency-Key", "k1")
            .query("dry_run", "true")
            .form_field("merchantOrderId", "ORD1");

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.query[0].0, "dry_run");
        assert_eq!(request.form.as_ref().map(Vec::len), Some(1));
        assert!(request.json.is_none());
    }
}
