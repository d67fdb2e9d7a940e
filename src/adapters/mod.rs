//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the client to external systems:
//! - `gurutvapay` - HTTP transport, retry, token lifecycle and the gateway facade
//! - `storage` - Token cache implementations (file, in-memory)

pub mod gurutvapay;
pub mod storage;

pub use gurutvapay::{GurutvapayClient, MockTransport, ReqwestTransport, WebhookVerifier};
pub use storage::{FileTokenCache, InMemoryTokenCache};
