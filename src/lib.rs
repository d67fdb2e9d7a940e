//! GurutvaPay - Payment gateway client
//!
//! This crate talks to the GurutvaPay HTTP API: credential-derived token
//! acquisition with a process-safe cache, retry with backoff, payment and
//! transaction calls, and webhook signature verification.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::gurutvapay::{verify_webhook, GurutvapayClient, WebhookVerifier};
pub use config::{AppConfig, Environment, GatewayConfig};
pub use domain::{AccessToken, Customer, PaymentInitiation, PaymentOrder};
pub use ports::{ApiRequest, GatewayError, GatewayErrorKind, PaymentGateway};
