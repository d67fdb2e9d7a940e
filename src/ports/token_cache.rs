//! Token Cache Port - Interface for persisting access tokens.
//!
//! Tokens are keyed by environment. Implementations must make `put_atomic`
//! all-or-nothing: a concurrent reader sees either the previous record or the
//! new one, never a partial write.

use async_trait::async_trait;

use crate::domain::AccessToken;

/// Errors that can occur during token cache operations
#[derive(Debug, thiserror::Error)]
pub enum TokenCacheError {
    #[error("Failed to serialize token: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Lock error: {0}")]
    LockFailed(String),
}

/// Port for storing and loading access tokens
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Load the token stored under `key`
    ///
    /// # Returns
    /// `None` when nothing usable is stored
    async fn get(&self, key: &str) -> Result<Option<AccessToken>, TokenCacheError>;

    /// Replace the token stored under `key` in a single atomic step
    ///
    /// # Errors
    /// Returns `TokenCacheError` if the write fails; the previous record stays intact
    async fn put_atomic(&self, key: &str, token: &AccessToken) -> Result<(), TokenCacheError>;
}
