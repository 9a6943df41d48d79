//! Cache key definitions.
//!
//! `CacheTag` names content an entry was built from; `CacheKey` names the
//! entry itself in one of the two stores.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque label attached to cached entries at read time, e.g. `post` or
/// `generalPage:faq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CacheTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Query cache key: the query text plus its canonical parameter encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub query_hash: u64,
    pub params_hash: u64,
}

impl QueryKey {
    pub fn new(query: &str, canonical_params: &str) -> Self {
        Self {
            query_hash: hash_value(&query),
            params_hash: hash_value(&canonical_params),
        }
    }
}

/// Response cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query_hash: u64,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query.unwrap_or("")),
        }
    }
}

/// Unified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Query(QueryKey),
    Response(ResponseKey),
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a request query string for response keys.
pub fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}

/// Canonical form of a page path: trailing slashes dropped except for the root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or_default();
    let stripped = without_query.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}
