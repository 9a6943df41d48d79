//! The process-wide cache: both stores plus the tag registry that ties them
//! to content.

use std::collections::HashSet;

use metrics::counter;
use serde_json::Value;
use tracing::debug;

use super::config::CacheConfig;
use super::epoch::{Epoch, PurgeLog};
use super::keys::{CacheKey, CacheTag, QueryKey, ResponseKey, normalize_path};
use super::registry::TagRegistry;
use super::store::{CachedResponse, QueryStore, ResponseStore};

pub struct SiteCache {
    config: CacheConfig,
    queries: QueryStore,
    responses: ResponseStore,
    registry: TagRegistry,
    purges: PurgeLog,
}

impl SiteCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            queries: QueryStore::new(&config),
            responses: ResponseStore::new(&config),
            registry: TagRegistry::new(),
            purges: PurgeLog::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn lookup_query(&self, key: &QueryKey) -> Option<Value> {
        if !self.config.enable_query_cache {
            return None;
        }
        self.queries.get(key)
    }

    /// Take before reading content that will be stored, so a purge that
    /// lands in between keeps the stale result out.
    pub fn observe(&self) -> Epoch {
        self.purges.observe()
    }

    /// Store a query result unless one of `tags` was purged after
    /// `observed`. Returns whether the result was stored.
    pub fn store_query(
        &self,
        key: QueryKey,
        value: Value,
        tags: &[CacheTag],
        observed: Epoch,
    ) -> bool {
        if !self.config.enable_query_cache {
            return false;
        }
        let stored = self.purges.store_if_current(observed, tags, None, || {
            if let Some(evicted) = self.queries.set(key, value) {
                self.registry.unregister(&CacheKey::Query(evicted));
            }
            self.registry
                .register(CacheKey::Query(key), tags.iter().cloned().collect());
        });
        if stored.is_none() {
            debug!(cache = "query", "skipped store of result read before a purge");
        }
        stored.is_some()
    }

    pub fn lookup_response(&self, key: &ResponseKey) -> Option<CachedResponse> {
        if !self.config.enable_response_cache {
            return None;
        }
        self.responses.get(key)
    }

    pub fn store_response(
        &self,
        key: ResponseKey,
        response: CachedResponse,
        tags: HashSet<CacheTag>,
        observed: Epoch,
    ) -> bool {
        if !self.config.enable_response_cache {
            return false;
        }
        let path = normalize_path(&key.path);
        let stored = self
            .purges
            .store_if_current(observed, &tags, Some(&path), || {
                if let Some(evicted) = self.responses.set(key.clone(), response) {
                    self.registry.unregister(&CacheKey::Response(evicted));
                }
                self.registry.register(CacheKey::Response(key), tags.clone());
            });
        if stored.is_none() {
            debug!(cache = "response", path = %path, "skipped store of page rendered before a purge");
        }
        stored.is_some()
    }

    /// Drop every query result and response tagged with `tag`.
    /// Returns the number of entries removed.
    pub fn purge_tag(&self, tag: &str) -> usize {
        let removed = self.purges.purge_tag(tag, || {
            let affected = self.registry.unregister_tag(tag);
            affected
                .iter()
                .filter(|key| match key {
                    CacheKey::Query(query) => self.queries.remove(query),
                    CacheKey::Response(response) => self.responses.remove(response),
                })
                .count()
        });
        counter!("jha_cache_invalidate_total", "kind" => "tag").increment(1);
        debug!(tag, removed, "purged cache tag");
        removed
    }

    /// Drop every cached response for a page path, across query strings.
    /// Returns the number of entries removed.
    pub fn purge_path(&self, path: &str) -> usize {
        let normalized = normalize_path(path);
        let removed = self.purges.purge_path(&normalized, || {
            let removed = self.responses.remove_path(&normalized);
            for key in &removed {
                self.registry.unregister(&CacheKey::Response(key.clone()));
            }
            removed
        });
        counter!("jha_cache_invalidate_total", "kind" => "path").increment(1);
        debug!(path = %normalized, removed = removed.len(), "purged cache path");
        removed.len()
    }

    pub fn clear(&self) {
        self.purges.purge_all(|| {
            self.queries.clear();
            self.responses.clear();
            self.registry.clear();
        });
    }

    pub fn query_len(&self) -> usize {
        self.queries.len()
    }

    pub fn response_len(&self) -> usize {
        self.responses.len()
    }
}

impl Default for SiteCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
