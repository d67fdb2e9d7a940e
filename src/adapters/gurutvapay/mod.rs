//! GurutvaPay gateway adapter.
//!
//! Implements the `PaymentGateway` port for the GurutvaPay HTTP API, including:
//! - Password-grant login with a shared token cache
//! - Payment initiation, transaction status and listing
//! - Retry with exponential backoff for transient failures
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Credentials and tokens are held in `secrecy::SecretString` or redacted in `Debug`
//! - Request and response bodies are never logged

mod client;
mod mock_transport;
mod retry;
mod token_manager;
mod transport;
mod webhook;

pub use client::GurutvapayClient;
pub use mock_transport::MockTransport;
pub use retry::RetryPolicy;
pub use token_manager::TokenManager;
pub use transport::ReqwestTransport;
pub use webhook::{find_signature, sign_payload, verify_webhook, WebhookVerifier, SIGNATURE_HEADERS};
