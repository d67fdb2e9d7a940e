//! Inbound webhook authentication.
//!
//! GurutvaPay signs the raw request body with HMAC-SHA256 using the shared
//! webhook secret and sends the hex digest in `X-Signature` (or
//! `X-Gurutvapay-Signature`), optionally prefixed with `sha256=`.
//!
//! # Security
//!
//! - Digests are compared in constant time
//! - Verification needs the exact bytes received, before any JSON parsing

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header names that may carry the signature, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 2] = ["X-Signature", "X-Gurutvapay-Signature"];

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check `signature_header` against the HMAC-SHA256 of `payload`.
///
/// Returns `false` for a malformed header as well as for a mismatch.
pub fn verify_webhook(payload: &[u8], signature_header: &str, secret: &str) -> bool {
    let digest = signature_header.trim();
    let digest = digest.strip_prefix(SIGNATURE_PREFIX).unwrap_or(digest);

    let Some(provided) = hex_decode(digest) else {
        tracing::warn!("Webhook signature is not a hex digest");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
        tracing::warn!(payload_len = payload.len(), "Invalid webhook signature");
        return false;
    }

    true
}

/// Hex-encoded HMAC-SHA256 of `payload`, as the gateway would send it.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex_encode(&mac.finalize().into_bytes())
}

/// Pick the signature out of a request's headers, matching names
/// case-insensitively.
pub fn find_signature<'a, I>(headers: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let headers: Vec<(&str, &str)> = headers.into_iter().collect();
    SIGNATURE_HEADERS.iter().find_map(|wanted| {
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| *value)
    })
}

/// Webhook verifier bound to one shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    pub fn from_secret(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify a payload against a signature header value.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        verify_webhook(payload, signature_header, self.secret.expose_secret())
    }

    /// Verify a payload using whichever signature header is present.
    pub fn verify_request<'a, I>(&self, payload: &[u8], headers: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        match find_signature(headers) {
            Some(signature) => self.verify(payload, signature),
            None => {
                tracing::warn!("Webhook request carries no signature header");
                false
            }
        }
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.is_empty() || !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
