//! File-based Token Cache Adapter
//!
//! Stores one JSON record per environment:
//! `<base_path>/token_<key>.json` containing `{"access_token", "expires_at"}`.
//!
//! Writes go to a uniquely named temporary file in the same directory, taken
//! under an exclusive advisory lock, flushed, then renamed over the record.
//! Reads take a shared advisory lock. Concurrent writers in other processes
//! therefore resolve to last-writer-wins and readers never see a torn file.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use uuid::Uuid;

use crate::domain::AccessToken;
use crate::ports::{TokenCache, TokenCacheError};

/// File-based storage for access tokens
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    base_path: PathBuf,
}

impl FileTokenCache {
    /// Create a new file cache rooted at a directory
    ///
    /// # Example
    /// ```ignore
    /// let cache = FileTokenCache::new(std::env::temp_dir().join("gurutvapay"));
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the record path for a key
    pub fn token_file_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("token_{}.json", safe))
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn get(&self, key: &str) -> Result<Option<AccessToken>, TokenCacheError> {
        let path = self.token_file_path(key);

        let contents = tokio::task::spawn_blocking(move || read_shared(&path))
            .await
            .map_err(|e| TokenCacheError::IoError(e.to_string()))??;

        let Some(contents) = contents else {
            return Ok(None);
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<AccessToken>(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable token cache record");
                Ok(None)
            }
        }
    }

    async fn put_atomic(&self, key: &str, token: &AccessToken) -> Result<(), TokenCacheError> {
        let json = serde_json::to_vec(token)
            .map_err(|e| TokenCacheError::SerializationFailed(e.to_string()))?;

        let dir = self.base_path.clone();
        let path = self.token_file_path(key);

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &json))
            .await
            .map_err(|e| TokenCacheError::IoError(e.to_string()))?
    }
}

fn read_shared(path: &Path) -> Result<Option<String>, TokenCacheError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TokenCacheError::IoError(e.to_string())),
    };

    FileExt::lock_shared(&file).map_err(|e| TokenCacheError::LockFailed(e.to_string()))?;
    let mut contents = String::new();
    let read = file.read_to_string(&mut contents);
    let _ = FileExt::unlock(&file);

    read.map_err(|e| TokenCacheError::IoError(e.to_string()))?;
    Ok(Some(contents))
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), TokenCacheError> {
    fs::create_dir_all(dir).map_err(|e| TokenCacheError::IoError(e.to_string()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("token");
    let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let result = write_locked(&tmp_path, bytes).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|e| TokenCacheError::IoError(e.to_string()))
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_locked(tmp_path: &Path, bytes: &[u8]) -> Result<(), TokenCacheError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(tmp_path)
        .map_err(|e| TokenCacheError::IoError(e.to_string()))?;

    FileExt::lock_exclusive(&file).map_err(|e| TokenCacheError::LockFailed(e.to_string()))?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    let _ = FileExt::unlock(&file);

    written.map_err(|e| TokenCacheError::IoError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (FileTokenCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = FileTokenCache::new(dir.path().join("tokens"));
        (cache, dir)
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (cache, _dir) = setup();
        assert!(cache.get("uat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trip_preserves_value_and_expiry() {
        let (cache, _dir) = setup();
        let token = AccessToken::new("abc", 1_900_000_000);

        cache.put_atomic("uat", &token).await.unwrap();
        let loaded = cache.get("uat").await.unwrap().unwrap();

        assert_eq!(loaded.value(), "abc");
        assert_eq!(loaded.expires_at(), 1_900_000_000);
    }

    #[tokio::test]
    async fn record_is_plain_json_on_disk() {
        let (cache, _dir) = setup();
        cache
            .put_atomic("live", &AccessToken::new("abc", 42))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(cache.token_file_path("live")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json, serde_json::json!({"access_token": "abc", "expires_at": 42}));
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let (cache, _dir) = setup();
        cache.put_atomic("uat", &AccessToken::new("u", 1)).await.unwrap();
        cache.put_atomic("live", &AccessToken::new("l", 2)).await.unwrap();

        assert_eq!(cache.get("uat").await.unwrap().unwrap().value(), "u");
        assert_eq!(cache.get("live").await.unwrap().unwrap().value(), "l");
    }

    #[tokio::test]
    async fn overwrite_replaces_record() {
        let (cache, _dir) = setup();
        cache.put_atomic("uat", &AccessToken::new("old", 1)).await.unwrap();
        cache.put_atomic("uat", &AccessToken::new("new", 2)).await.unwrap();

        let loaded = cache.get("uat").await.unwrap().unwrap();
        assert_eq!(loaded, AccessToken::new("new", 2));
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_missing() {
        let (cache, _dir) = setup();
        let path = cache.token_file_path("uat");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"access_tok").unwrap();

        assert!(cache.get("uat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn key_is_sanitized_into_file_name() {
        let (cache, _dir) = setup();
        let path = cache.token_file_path("../etc/passwd");
        assert_eq!(path.file_name().unwrap(), "token____etc_passwd.json");
    }

    #[tokio::test]
    async fn concurrent_writers_never_produce_torn_record() {
        let (cache, dir) = setup();
        let cache = Arc::new(cache);
        let mut handles = Vec::new();

        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let token = AccessToken::new(format!("token-{}", i), 1_000 + i);
                cache.put_atomic("uat", &token).await.unwrap();
                // A read racing other writers must decode to some complete record
                let seen = cache.get("uat").await.unwrap().unwrap();
                assert!(seen.value().starts_with("token-"));
                assert_eq!(seen.expires_at(), 1_000 + seen.value()[6..].parse::<i64>().unwrap());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let last = cache.get("uat").await.unwrap().unwrap();
        assert!(last.value().starts_with("token-"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("tokens"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
