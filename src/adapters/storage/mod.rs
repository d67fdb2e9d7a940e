//! Storage Adapters
//!
//! Implementations of the TokenCache port.
//!
//! ## Available Adapters
//!
//! - **FileTokenCache** - JSON record per environment, lock-and-rename writes
//! - **InMemoryTokenCache** - process-local map (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use gurutvapay::adapters::storage::{FileTokenCache, InMemoryTokenCache};
//!
//! // Production: shared across processes
//! let cache = FileTokenCache::new(config.cache_dir());
//!
//! // Testing
//! let cache = InMemoryTokenCache::new();
//! ```

mod file_token_cache;
mod in_memory_token_cache;

pub use file_token_cache::FileTokenCache;
pub use in_memory_token_cache::InMemoryTokenCache;
