//! Cache storage implementations.
//!
//! Query store: raw CMS results keyed by query and parameters.
//! Response store: rendered HTTP responses keyed by path and query string.
//!
//! Both are LRU bounded and every entry carries an expiry instant. An expired
//! entry reads as a miss and is dropped on that read.

use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use serde_json::Value;

use super::config::CacheConfig;
use super::keys::{QueryKey, ResponseKey, normalize_path};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Clone)]
struct Expiring<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Expiring<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Fetch a fresh value, dropping it when it has expired.
fn get_fresh<K: Hash + Eq, V: Clone>(
    cache: &RwLock<LruCache<K, Expiring<V>>>,
    key: &K,
    op: &'static str,
) -> Option<V> {
    let mut guard = rw_write(cache, SOURCE, op);
    let now = Instant::now();
    let lookup = guard
        .get(key)
        .map(|entry| entry.is_fresh(now).then(|| entry.value.clone()));
    match lookup {
        Some(Some(value)) => Some(value),
        Some(None) => {
            guard.pop(key);
            None
        }
        None => None,
    }
}

/// Insert a value and report a different key that had to make room.
fn insert<K: Hash + Eq + Clone, V>(
    cache: &RwLock<LruCache<K, Expiring<V>>>,
    key: K,
    entry: Expiring<V>,
    op: &'static str,
) -> Option<K> {
    let mut guard = rw_write(cache, SOURCE, op);
    guard
        .push(key.clone(), entry)
        .map(|(pushed_out, _)| pushed_out)
        .filter(|pushed_out| *pushed_out != key)
}

// ============================================================================
// Query Store
// ============================================================================

pub struct QueryStore {
    entries: RwLock<LruCache<QueryKey, Expiring<Value>>>,
    ttl: Duration,
}

impl QueryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.query_limit_non_zero())),
            ttl: config.query_ttl,
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        let found = get_fresh(&self.entries, key, "query_get");
        if found.is_some() {
            counter!("jha_cache_query_hit_total").increment(1);
        } else {
            counter!("jha_cache_query_miss_total").increment(1);
        }
        found
    }

    /// Store a result, returning the key evicted to make room, if any.
    pub fn set(&self, key: QueryKey, value: Value) -> Option<QueryKey> {
        let evicted = insert(
            &self.entries,
            key,
            Expiring::new(value, self.ttl),
            "query_set",
        );
        if evicted.is_some() {
            counter!("jha_cache_query_evict_total").increment(1);
        }
        evicted
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        rw_write(&self.entries, SOURCE, "query_remove")
            .pop(key)
            .is_some()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "query_clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "query_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Response Store
// ============================================================================

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

pub struct ResponseStore {
    responses: RwLock<LruCache<ResponseKey, Expiring<CachedResponse>>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
            ttl: config.response_ttl,
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let found = get_fresh(&self.responses, key, "response_get");
        if found.is_some() {
            counter!("jha_cache_response_hit_total").increment(1);
        } else {
            counter!("jha_cache_response_miss_total").increment(1);
        }
        found
    }

    /// Store a response, returning the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        let evicted = insert(
            &self.responses,
            key,
            Expiring::new(response, self.ttl),
            "response_set",
        );
        if evicted.is_some() {
            counter!("jha_cache_response_evict_total").increment(1);
        }
        evicted
    }

    pub fn remove(&self, key: &ResponseKey) -> bool {
        rw_write(&self.responses, SOURCE, "response_remove")
            .pop(key)
            .is_some()
    }

    /// Drop every cached variant of a page path, whatever its query string.
    /// Returns the removed keys.
    pub fn remove_path(&self, path: &str) -> Vec<ResponseKey> {
        let target = normalize_path(path);
        let mut guard = rw_write(&self.responses, SOURCE, "response_remove_path");
        let matching: Vec<ResponseKey> = guard
            .iter()
            .filter(|(key, _)| normalize_path(&key.path) == target)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            guard.pop(key);
        }
        matching
    }

    pub fn clear(&self) {
        rw_write(&self.responses, SOURCE, "response_clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "response_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;

    use super::*;

    fn page(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(body),
        }
    }

    #[test]
    fn query_store_roundtrip() {
        let store = QueryStore::new(&CacheConfig::default());
        let key = QueryKey::new("*[_type == \"program\"]", "{}");

        assert!(store.get(&key).is_none());
        assert!(store.set(key, json!([{"title": "Upper School"}])).is_none());
        assert_eq!(store.get(&key), Some(json!([{"title": "Upper School"}])));

        assert!(store.remove(&key));
        assert!(store.get(&key).is_none());
        assert!(!store.remove(&key));
    }

    #[test]
    fn expired_entries_read_as_miss_and_are_dropped() {
        let config = CacheConfig {
            query_ttl: Duration::ZERO,
            ..Default::default()
        };
        let store = QueryStore::new(&config);
        let key = QueryKey::new("*[_type == \"homePage\"][0]", "{}");

        store.set(key, json!({"heroTitle": "Welcome"}));
        assert_eq!(store.len(), 1);
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn query_store_lru_eviction_reports_evicted_key() {
        let config = CacheConfig {
            query_limit: 2,
            ..Default::default()
        };
        let store = QueryStore::new(&config);
        let first = QueryKey::new("a", "{}");
        let second = QueryKey::new("b", "{}");
        let third = QueryKey::new("c", "{}");

        store.set(first, json!(1));
        store.set(second, json!(2));
        assert_eq!(store.set(third, json!(3)), Some(first));

        assert!(store.get(&first).is_none());
        assert!(store.get(&second).is_some());
        assert!(store.get(&third).is_some());
    }

    #[test]
    fn replacing_a_key_is_not_an_eviction() {
        let store = QueryStore::new(&CacheConfig::default());
        let key = QueryKey::new("a", "{}");
        store.set(key, json!(1));
        assert!(store.set(key, json!(2)).is_none());
        assert_eq!(store.get(&key), Some(json!(2)));
    }

    #[test]
    fn response_store_removes_every_query_variant_of_a_path() {
        let store = ResponseStore::new(&CacheConfig::default());
        store.set(ResponseKey::new("/news", None), page("index"));
        store.set(ResponseKey::new("/news", Some("page=2")), page("page two"));
        store.set(ResponseKey::new("/news/spring-fair", None), page("detail"));

        let removed = store.remove_path("/news/");
        assert_eq!(removed.len(), 2);
        assert!(store.get(&ResponseKey::new("/news", None)).is_none());
        assert!(
            store
                .get(&ResponseKey::new("/news/spring-fair", None))
                .is_some()
        );
    }

    #[test]
    fn response_store_roundtrip() {
        let store = ResponseStore::new(&CacheConfig::default());
        let key = ResponseKey::new("/programs", None);

        store.set(key.clone(), page("Hello"));
        let cached = store.get(&key).expect("cached response");
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, Bytes::from("Hello"));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = ResponseStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .responses
                .write()
                .expect("responses lock should be acquired");
            panic!("poison responses lock");
        }));

        let key = ResponseKey::new("/", None);
        store.set(key.clone(), page("home"));
        assert!(store.get(&key).is_some());
    }
}
