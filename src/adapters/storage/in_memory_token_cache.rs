//! In-Memory Token Cache Adapter
//!
//! Keeps tokens in a process-local map. Useful for testing and for
//! deployments where tokens need not survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::AccessToken;
use crate::ports::{TokenCache, TokenCacheError};

/// In-memory storage for access tokens
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenCache {
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryTokenCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with one token
    pub fn with_token(key: impl Into<String>, token: AccessToken) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(key.into(), token);
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `put_atomic` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Clear all stored tokens
    pub async fn clear(&self) {
        self.tokens.write().await.clear();
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<AccessToken>, TokenCacheError> {
        Ok(self.tokens.read().await.get(key).cloned())
    }

    async fn put_atomic(&self, key: &str, token: &AccessToken) -> Result<(), TokenCacheError> {
        self.tokens
            .write()
            .await
            .insert(key.to_string(), token.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
