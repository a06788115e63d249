//! Short-lived in-memory cache. Entries expire after their TTL and are
//! dropped lazily; there is no other eviction.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            ttl: self.ttl,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().await;
        if entries.get(key).map_or(false, |e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.ttl).await
    }

    pub async fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key).map(|e| e.value)
    }

    /// Removes every entry whose key matches `pred`.
    pub async fn remove_where<F: Fn(&K) -> bool>(&self, pred: F) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !pred(k));
        before - entries.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the cached value or loads, stores and returns a fresh one.
    /// Load errors are passed through and nothing is cached.
    pub async fn get_or_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key).await {
            return Ok(v);
        }
        let value = load().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_get_insert_remove() {
        let cache = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"a").await, None);
        cache.insert("a", 1).await;
        assert_eq!(cache.get(&"a").await, Some(1));
        assert_eq!(cache.remove(&"a").await, Some(1));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_returned() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("gone", 1, Duration::ZERO).await;
        cache.insert("kept", 2).await;
        assert_eq!(cache.get(&"gone").await, None);
        assert_eq!(cache.len().await, 1);
        cache.insert_with_ttl("gone-too", 3, Duration::ZERO).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.get(&"kept").await, Some(2));
    }

    #[tokio::test]
    async fn test_get_or_insert_with_loads_once() {
        let cache: TtlCache<i32, String> = TtlCache::new(Duration::from_secs(60));
        let v: Result<_, ()> = cache.get_or_insert_with(1, || async { Ok("first".to_owned()) }).await;
        assert_eq!(v.unwrap(), "first");
        let v: Result<_, ()> = cache.get_or_insert_with(1, || async { Ok("second".to_owned()) }).await;
        assert_eq!(v.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_load_error_is_not_cached() {
        let cache: TtlCache<i32, i32> = TtlCache::new(Duration::from_secs(60));
        let v = cache.get_or_insert_with(1, || async { Err::<i32, _>("boom") }).await;
        assert_eq!(v, Err("boom"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_where() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert((1, "a"), 1).await;
        cache.insert((1, "b"), 2).await;
        cache.insert((2, "a"), 3).await;
        assert_eq!(cache.remove_where(|k| k.0 == 1).await, 2);
        assert_eq!(cache.get(&(2, "a")).await, Some(3));
    }
}
