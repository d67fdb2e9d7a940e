//! Classified result of a single gateway HTTP attempt.

use serde_json::Value;

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network error, timeout, HTTP 5xx or 429. Eligible for retry.
    Transient,
    /// HTTP 401 or 403.
    Auth,
    /// HTTP 404.
    NotFound,
    /// Any other 4xx, or an undecodable 2xx body.
    Permanent,
}

impl FailureKind {
    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FailureKind::Auth,
            404 => FailureKind::NotFound,
            429 | 500..=599 => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

/// A failed attempt with everything needed for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    /// HTTP status, or 0 when no response was received.
    pub status: u16,
    pub raw_body: String,
}

impl Failure {
    /// No response at all: connect failure or timeout.
    pub fn network() -> Self {
        Self {
            kind: FailureKind::Transient,
            status: 0,
            raw_body: String::new(),
        }
    }

    /// Non-2xx response, classified by status.
    pub fn from_status(status: u16, raw_body: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::from_status(status),
            status,
            raw_body: raw_body.into(),
        }
    }

    /// 2xx response whose body is not JSON.
    pub fn undecodable(status: u16, raw_body: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            status,
            raw_body: raw_body.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }
}

/// Outcome of one transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Value),
    Failure(Failure),
}

impl RequestOutcome {
    pub fn is_transient_failure(&self) -> bool {
        matches!(self, RequestOutcome::Failure(f) if f.kind.is_transient())
    }
}
