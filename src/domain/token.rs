//! Access token value object and expiry resolution.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expiry assumed when a login response carries no expiry information.
pub const FALLBACK_TTL_SECS: i64 = 300;

/// Bearer credential obtained from a login call.
///
/// Serialized form is the on-disk cache record:
/// `{"access_token": "...", "expires_at": <epoch seconds>}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    value: String,
    expires_at: i64,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token string to place after `Bearer `.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Absolute expiry in epoch seconds.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// True once `now` has entered the refresh window before expiry.
    pub fn is_stale(&self, now: i64, buffer_secs: i64) -> bool {
        now >= self.expires_at.saturating_sub(buffer_secs)
    }

    /// Build a token from a login response body.
    ///
    /// Returns `None` when `access_token` is missing or empty.
    pub fn from_login_response(body: &Value, now: i64) -> Option<Self> {
        let value = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?;
        Some(Self::new(value, resolve_expiry(body, now)))
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where the token manager stands for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing cached.
    NoToken,
    /// Cached and outside the refresh window.
    CachedValid,
    /// Cached but inside the refresh window.
    CachedStale,
    /// A login is in flight.
    Refreshing,
}

impl TokenState {
    /// Classify a cache lookup result.
    pub fn classify(cached: Option<&AccessToken>, now: i64, buffer_secs: i64) -> Self {
        match cached {
            None => TokenState::NoToken,
            Some(token) if token.is_stale(now, buffer_secs) => TokenState::CachedStale,
            Some(_) => TokenState::CachedValid,
        }
    }

    /// Whether a login is required before the token can be used.
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, TokenState::CachedValid)
    }
}

/// Compute the absolute expiry of a login response.
///
/// Precedence: `expires_at` epoch, then `expires_at_iso`, then `expires_in`
/// relative to `now`, then `now + FALLBACK_TTL_SECS`.
pub fn resolve_expiry(body: &Value, now: i64) -> i64 {
    if let Some(at) = body.get("expires_at").and_then(as_seconds) {
        return at;
    }

    if let Some(at) = body
        .get("expires_at_iso")
        .and_then(Value::as_str)
        .and_then(parse_iso8601)
    {
        return at;
    }

    if let Some(ttl) = body.get("expires_in").and_then(as_seconds) {
        return now.saturating_add(ttl);
    }

    now.saturating_add(FALLBACK_TTL_SECS)
}

/// Accept integers, floats and numeric strings.
fn as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

fn parse_iso8601(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // Offset-less timestamps are taken as UTC
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}
