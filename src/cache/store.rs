//! Keyed, TTL-based cache of remote query results.
//!
//! Entries are keyed by a logical resource name plus parameters, held in
//! memory as JSON values, and mirrored to disk inside the partition
//! directory so cached data survives restarts. A value is served without a
//! network call while it is fresher than the caller's TTL; `invalidate`
//! forces the next access to reload. Concurrent fetches for the same key
//! are deduplicated through a per-key async lock.

// Allow dead code: Infrastructure methods for future use
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Entries older than this are removed by the garbage-collection sweep,
/// regardless of per-fetch TTLs.
const DEFAULT_GC_MINUTES: i64 = 24 * 60;

/// Cache key: logical resource name plus a parameter string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: String,
    params: String,
}

impl CacheKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: String::new(),
        }
    }

    pub fn with_params(resource: impl Into<String>, params: impl ToString) -> Self {
        Self {
            resource: resource.into(),
            params: params.to_string(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Disk file name for this key. Parameters are sanitized so the name is
    /// always a plain path component.
    fn file_name(&self) -> String {
        if self.params.is_empty() {
            format!("{}.json", self.resource)
        } else {
            let safe: String = self
                .params
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            format!("{}_{}.json", self.resource, safe)
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}({})", self.resource, self.params)
        }
    }
}

/// A cached value with its freshness timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.cached_at;
        // Negative ages come from clock skew; treat them as fresh
        age <= ttl
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Process-wide cache of remote query results, shared by all readers.
pub struct QueryCache {
    dir: PathBuf,
    entries: Mutex<HashMap<CacheKey, CachedData<serde_json::Value>>>,
    /// Per-key loader locks for deduplicating concurrent fetches.
    loaders: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    gc_window: Duration,
}

impl QueryCache {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir).context("Failed to create cache directory")?;
        Ok(Self {
            dir,
            entries: Mutex::new(HashMap::new()),
            loaders: Mutex::new(HashMap::new()),
            gc_window: Duration::minutes(DEFAULT_GC_MINUTES),
        })
    }

    pub fn with_gc_window(mut self, window: Duration) -> Self {
        self.gc_window = window;
        self
    }

    /// Return the cached value for `key` if fresher than `ttl`, otherwise run
    /// the loader, store its result, and return it.
    ///
    /// Only one loader runs per key at a time; concurrent callers wait and
    /// observe the winner's result.
    pub async fn fetch<T, F, Fut>(&self, key: CacheKey, ttl: Duration, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.evict_expired().await;

        if let Some(value) = self.lookup(&key, ttl).await {
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let lock = self.loader_lock(&key).await;
        let _guard = lock.lock().await;

        // Double check: a concurrent caller may have loaded while we waited
        if let Some(value) = self.lookup(&key, ttl).await {
            debug!(key = %key, "Cache hit after waiting on in-flight load");
            return Ok(value);
        }

        debug!(key = %key, "Cache miss, running loader");
        let value = loader().await?;
        let json = serde_json::to_value(&value).context("Failed to encode cache value")?;
        self.store(&key, json).await;
        Ok(value)
    }

    /// Read the cached value regardless of freshness, for offline display.
    pub async fn peek<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedData<T>> {
        let entries = self.entries.lock().await;
        let cached = match entries.get(key) {
            Some(cached) => cached.clone(),
            None => {
                drop(entries);
                self.load_from_disk(key)?
            }
        };
        match serde_json::from_value(cached.data) {
            Ok(data) => Some(CachedData {
                data,
                cached_at: cached.cached_at,
            }),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value no longer decodes, ignoring");
                None
            }
        }
    }

    /// Mark one entry stale so the next access reloads it.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.lock().await.remove(key);
        let path = self.dir.join(key.file_name());
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(key = %key, error = %e, "Failed to remove cache file");
            }
        }
        debug!(key = %key, "Invalidated cache entry");
    }

    /// Invalidate every entry for a resource, whatever its parameters.
    pub async fn invalidate_resource(&self, resource: &str) {
        let mut entries = self.entries.lock().await;
        let stale: Vec<CacheKey> = entries
            .keys()
            .filter(|k| k.resource() == resource)
            .cloned()
            .collect();
        for key in &stale {
            entries.remove(key);
        }
        drop(entries);

        let prefix = format!("{}_", resource);
        let exact = format!("{}.json", resource);
        if let Ok(dir) = std::fs::read_dir(&self.dir) {
            for entry in dir.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name == exact || name.starts_with(&prefix) {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        debug!(resource, "Invalidated resource");
    }

    /// Drop everything, memory and disk. Used on logout and re-login.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        self.loaders.lock().await.clear();
        if let Ok(dir) = std::fs::read_dir(&self.dir) {
            for entry in dir.flatten() {
                if entry.path().extension().is_some_and(|e| e == "json") {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        debug!("Cache cleared");
    }

    /// Garbage collection: drop in-memory entries older than the GC window.
    /// Disk copies are left for offline display and cleaned up on clear.
    pub async fn evict_expired(&self) {
        let mut entries = self.entries.lock().await;
        let window = self.gc_window;
        entries.retain(|_, cached| cached.is_fresh(window));
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey, ttl: Duration) -> Option<T> {
        let entries = self.entries.lock().await;
        let cached = match entries.get(key) {
            Some(cached) if cached.is_fresh(ttl) => cached.clone(),
            Some(_) => return None,
            None => {
                drop(entries);
                match self.load_from_disk(key) {
                    Some(cached) if cached.is_fresh(ttl) => {
                        self.entries.lock().await.insert(key.clone(), cached.clone());
                        cached
                    }
                    _ => return None,
                }
            }
        };
        // An entry written by an older version may no longer decode; treat
        // it as a miss so the loader refreshes it
        match serde_json::from_value(cached.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value no longer decodes, reloading");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, value: serde_json::Value) {
        let cached = CachedData::new(value);
        if let Err(e) = self.save_to_disk(key, &cached) {
            warn!(key = %key, error = %e, "Failed to persist cache entry");
        }
        self.entries.lock().await.insert(key.clone(), cached);
    }

    async fn loader_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut loaders = self.loaders.lock().await;
        Arc::clone(loaders.entry(key.clone()).or_default())
    }

    fn load_from_disk(&self, key: &CacheKey) -> Option<CachedData<serde_json::Value>> {
        let path = self.dir.join(key.file_name());
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to parse cache file");
                None
            }
        }
    }

    fn save_to_disk(&self, key: &CacheKey, cached: &CachedData<serde_json::Value>) -> Result<()> {
        let path = self.dir.join(key.file_name());
        let contents = serde_json::to_string_pretty(cached)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file for {}", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache_in(dir: &std::path::Path) -> QueryCache {
        QueryCache::new(dir.to_path_buf()).expect("Failed to create cache")
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_hits_cache() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = cache_in(tmp.path());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Vec<i64> = cache
                .fetch(CacheKey::new("users"), Duration::minutes(5), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .expect("Fetch should succeed");
            assert_eq!(value, vec![1, 2, 3]);
        }

        // One loader call for two fetches
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = cache_in(tmp.path());
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("materials");

        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7_i64)
        };
        let _: i64 = cache
            .fetch(key.clone(), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");
        cache.invalidate(&key).await;
        let _: i64 = cache
            .fetch(key.clone(), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_deduplicated() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = Arc::new(cache_in(tmp.path()));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |cache: Arc<QueryCache>, calls: Arc<AtomicUsize>| async move {
            cache
                .fetch(CacheKey::new("stock"), Duration::minutes(5), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok("full".to_string())
                })
                .await
                .expect("Fetch should succeed")
        };

        let (a, b) = tokio::join!(
            fetch(Arc::clone(&cache), Arc::clone(&calls)),
            fetch(Arc::clone(&cache), Arc::clone(&calls)),
        );
        assert_eq!(a, "full");
        assert_eq!(b, "full");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_survives_restart_via_disk() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let key = CacheKey::with_params("stock", 3);
        {
            let cache = cache_in(tmp.path());
            let _: i64 = cache
                .fetch(key.clone(), Duration::minutes(5), || async { Ok(99) })
                .await
                .expect("Fetch should succeed");
        }

        // Fresh cache instance over the same directory sees the entry
        let cache = cache_in(tmp.path());
        let calls = AtomicUsize::new(0);
        let value: i64 = cache
            .fetch(key, Duration::minutes(5), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            })
            .await
            .expect("Fetch should succeed");
        assert_eq!(value, 99);
        // Loader never ran; the disk entry satisfied the fetch
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_schema_disk_entry_falls_through_to_loader() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        // A file written by an older version whose data no longer matches
        // the caller's type
        let stale = serde_json::json!({
            "data": {"old": "shape"},
            "cached_at": Utc::now(),
        });
        std::fs::write(tmp.path().join("users.json"), stale.to_string())
            .expect("Failed to seed cache file");

        let cache = cache_in(tmp.path());
        let calls = AtomicUsize::new(0);
        let value: Vec<i64> = cache
            .fetch(CacheKey::new("users"), Duration::minutes(5), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2])
            })
            .await
            .expect("Fetch should fall through to the loader");

        assert_eq!(value, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_resource_scopes_by_name() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = cache_in(tmp.path());
        let calls = AtomicUsize::new(0);

        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1_i64)
        };
        let _: i64 = cache
            .fetch(CacheKey::with_params("stock", 1), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");
        let _: i64 = cache
            .fetch(CacheKey::new("users"), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");

        cache.invalidate_resource("stock").await;

        let _: i64 = cache
            .fetch(CacheKey::with_params("stock", 1), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");
        let _: i64 = cache
            .fetch(CacheKey::new("users"), Duration::minutes(5), load)
            .await
            .expect("Fetch should succeed");

        // stock reloaded, users still cached
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cached_data_age_display() {
        let fresh = CachedData::new(1);
        assert_eq!(fresh.age_display(), "just now");

        let mut old = CachedData::new(1);
        old.cached_at = Utc::now() - Duration::minutes(90);
        assert_eq!(old.age_display(), "1h ago");
        assert!(!old.is_fresh(Duration::minutes(60)));
        assert!(old.is_fresh(Duration::minutes(120)));
    }

    #[test]
    fn test_cache_key_file_name_sanitized() {
        let key = CacheKey::with_params("stock", "3/..");
        assert_eq!(key.file_name(), "stock_3---.json");
        assert_eq!(CacheKey::new("users").file_name(), "users.json");
    }
}
