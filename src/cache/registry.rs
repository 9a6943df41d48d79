//! Bidirectional tag registry.
//!
//! Tracks which cache entries were built from which tags so a tag
//! invalidation can find every affected entry, and an evicted entry can be
//! forgotten by every tag that pointed at it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, CacheTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<CacheKey>>>,
    key_to_tags: RwLock<HashMap<CacheKey, HashSet<CacheTag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Associate a cache entry with the tags it was built from.
    ///
    /// Re-registering a key replaces its previous tag set.
    pub fn register(&self, cache_key: CacheKey, tags: HashSet<CacheTag>) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        if let Some(previous) = k2t.remove(&cache_key) {
            detach(&mut t2k, &cache_key, previous);
        }
        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(cache_key.clone());
        }
        k2t.insert(cache_key, tags);
    }

    /// All cache keys currently tagged with `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<CacheKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a cache key. Called when an entry is evicted or invalidated.
    pub fn unregister(&self, cache_key: &CacheKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(cache_key) {
            detach(&mut t2k, cache_key, tags);
        }
    }

    /// Drop every mapping for `tag`, returning the keys that carried it.
    ///
    /// Affected keys are removed entirely so that their other tags stop
    /// pointing at entries which no longer exist.
    pub fn unregister_tag(&self, tag: &str) -> HashSet<CacheKey> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister_tag.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister_tag.key_to_tags");

        let affected = t2k.remove(tag).unwrap_or_default();
        for cache_key in &affected {
            if let Some(tags) = k2t.remove(cache_key) {
                detach(&mut t2k, cache_key, tags);
            }
        }
        affected
    }

    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.tag_to_keys").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.key_to_tags").clear();
    }

    /// Number of tags with at least one live entry.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    /// Number of tracked cache keys.
    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(
    t2k: &mut HashMap<CacheTag, HashSet<CacheKey>>,
    cache_key: &CacheKey,
    tags: HashSet<CacheTag>,
) {
    for tag in tags {
        if let Some(keys) = t2k.get_mut(&tag) {
            keys.remove(cache_key);
            if keys.is_empty() {
                t2k.remove(&tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{QueryKey, ResponseKey};

    fn tags(values: &[&str]) -> HashSet<CacheTag> {
        values.iter().map(|value| CacheTag::from(*value)).collect()
    }

    fn query_key(seed: &str) -> CacheKey {
        CacheKey::Query(QueryKey::new(seed, "{}"))
    }

    #[test]
    fn register_and_lookup() {
        let registry = TagRegistry::new();
        let key = query_key("posts");

        registry.register(key.clone(), tags(&["post"]));

        assert!(registry.keys_for_tag("post").contains(&key));
        assert_eq!(registry.key_count(), 1);
        assert!(registry.keys_for_tag("program").is_empty());
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let registry = TagRegistry::new();
        let key = query_key("posts");
        registry.register(key.clone(), tags(&["post", "homePage"]));
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.tag_count(), 2);

        registry.unregister(&key);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn unregister_tag_removes_keys_from_sibling_tags() {
        let registry = TagRegistry::new();
        let page = CacheKey::Response(ResponseKey::new("/faq", None));
        let other = query_key("generalPage");

        registry.register(page.clone(), tags(&["generalPage", "generalPage:faq"]));
        registry.register(other.clone(), tags(&["generalPage"]));

        let affected = registry.unregister_tag("generalPage:faq");
        assert_eq!(affected.len(), 1);
        assert!(affected.contains(&page));

        let remaining = registry.keys_for_tag("generalPage");
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains(&other));
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn unregister_unknown_tag_is_noop() {
        let registry = TagRegistry::new();
        registry.register(query_key("posts"), tags(&["post"]));

        assert!(registry.unregister_tag("coop").is_empty());
        assert_eq!(registry.key_count(), 1);
    }

    #[test]
    fn re_register_replaces_previous_tags() {
        let registry = TagRegistry::new();
        let key = query_key("home");
        registry.register(key.clone(), tags(&["homePage"]));
        registry.register(key.clone(), tags(&["post"]));

        assert!(registry.keys_for_tag("homePage").is_empty());
        assert!(registry.keys_for_tag("post").contains(&key));
    }

    #[test]
    fn clear_removes_all_mappings() {
        let registry = TagRegistry::new();
        registry.register(query_key("a"), tags(&["post"]));
        registry.register(query_key("b"), tags(&["program"]));

        registry.clear();
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }
}
