//! Scripted transport for testing.
//!
//! Provides a configurable implementation of `HttpTransport` for unit and
//! integration tests. Supports:
//! - Queued outcomes, returned in order
//! - Request recording for assertions

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Failure, RequestOutcome};
use crate::ports::{GatewayRequest, HttpTransport};

/// Scripted transport for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockTransport::new();
/// mock.push_status(503, "");
/// mock.push_success(json!({"status": "pending"}));
///
/// let client = GurutvapayClient::with_parts(config, Arc::new(mock.clone()), cache);
/// ```
#[derive(Default, Clone)]
pub struct MockTransport {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Outcomes still to be returned.
    outcomes: VecDeque<RequestOutcome>,

    /// Every request seen, in order.
    requests: Vec<GatewayRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue an arbitrary outcome.
    pub fn push_outcome(&self, outcome: RequestOutcome) {
        self.inner.lock().unwrap().outcomes.push_back(outcome);
    }

    /// Queue a 2xx response with a JSON body.
    pub fn push_success(&self, body: Value) {
        self.push_outcome(RequestOutcome::Success(body));
    }

    /// Queue a non-2xx response.
    pub fn push_status(&self, status: u16, body: &str) {
        self.push_outcome(RequestOutcome::Failure(Failure::from_status(status, body)));
    }

    /// Queue a connection failure or timeout.
    pub fn push_network_error(&self) {
        self.push_outcome(RequestOutcome::Failure(Failure::network()));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Number of requests received.
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// Number of queued outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().outcomes.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &GatewayRequest) -> RequestOutcome {
        let mut state = self.inner.lock().unwrap();
        state.requests.push(request.clone());
        state.outcomes.pop_front().unwrap_or_else(|| {
            // An unscripted call behaves like an unreachable gateway
            RequestOutcome::Failure(Failure::network())
        })
    }
}
