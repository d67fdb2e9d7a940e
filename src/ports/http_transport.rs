//! HTTP transport port - one request, one classified outcome.
//!
//! Implementations perform exactly one network round trip per call and hold
//! no retry policy of their own. Timeouts and connection failures are
//! reported as transient failures with status 0; they never panic or error.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::domain::RequestOutcome;

/// Request body. At most one encoding can be chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(Value),
}

/// Fully resolved request handed to a transport.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl GatewayRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Value of the first header with this name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Port for a single HTTP exchange with the gateway.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request once and classify the result.
    async fn send(&self, request: &GatewayRequest) -> RequestOutcome;
}
