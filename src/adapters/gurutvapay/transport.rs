//! reqwest-backed implementation of the `HttpTransport` port.
//!
//! One call is one round trip. Status classification lives in
//! [`FailureKind::from_status`](crate::domain::FailureKind::from_status);
//! this module only turns reqwest results into a [`RequestOutcome`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::domain::{Failure, RequestOutcome};
use crate::ports::{GatewayError, GatewayRequest, HttpTransport, RequestBody};

/// HTTP transport over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose every attempt is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &GatewayRequest) -> RequestOutcome {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Json(body) => builder.json(body),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    url = %request.url,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    "Gateway request failed without a response"
                );
                return RequestOutcome::Failure(Failure::network());
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    url = %request.url,
                    status,
                    timeout = e.is_timeout(),
                    "Gateway response body could not be read"
                );
                return RequestOutcome::Failure(Failure::network());
            }
        };

        tracing::debug!(method = %request.method, url = %request.url, status, "Gateway responded");

        if !(200..300).contains(&status) {
            return RequestOutcome::Failure(Failure::from_status(status, text));
        }

        match serde_json::from_str(&text) {
            Ok(body) => RequestOutcome::Success(body),
            Err(e) => {
                tracing::warn!(url = %request.url, status, error = %e, "Gateway returned a non-JSON success body");
                RequestOutcome::Failure(Failure::undecodable(status, text))
            }
        }
    }
}
