//! Tagged, cached CMS reads.
//!
//! Every page loader goes through [`ContentFetcher::fetch`]: the result is
//! served from the query cache while fresh, and the request's tags are
//! recorded both on the cache entry and on the response being rendered so a
//! later tag invalidation drops both.

use std::sync::Arc;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheTag, QueryKey, SiteCache, deps};

use super::repos::{ContentStore, ContentStoreError, QueryParams};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Store(#[from] ContentStoreError),
    #[error("`{name}` result could not be decoded: {message}")]
    Decode { name: &'static str, message: String },
}

/// A read query with its parameters and cache tags.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Short label used in logs.
    pub name: &'static str,
    pub query: &'static str,
    pub params: QueryParams,
    pub tags: Vec<CacheTag>,
}

impl FetchRequest {
    pub fn new(name: &'static str, query: &'static str) -> Self {
        Self {
            name,
            query,
            params: QueryParams::new(),
            tags: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn tag(mut self, tag: impl Into<CacheTag>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }
}

#[derive(Clone)]
pub struct ContentFetcher {
    store: Arc<dyn ContentStore>,
    cache: Arc<SiteCache>,
}

impl ContentFetcher {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<SiteCache>) -> Self {
        Self { store, cache }
    }

    /// Run `request`, decoding the CMS `result` into `T`.
    ///
    /// A `null` result decodes to `None` when `T` is an `Option`. Failures
    /// are returned as-is: there is no retry, and nothing is cached.
    #[instrument(skip_all, fields(query = request.name))]
    pub async fn fetch<T: DeserializeOwned>(&self, request: &FetchRequest) -> Result<T, FetchError> {
        deps::record_all(&request.tags);

        let key = QueryKey::new(request.query, &request.params.canonical());
        if let Some(cached) = self.cache.lookup_query(&key) {
            debug!(cache = "query", outcome = "hit", "serving cached result");
            return decode(request.name, &cached);
        }

        let observed = self.cache.observe();
        let value = match self.store.query(request.query, &request.params).await {
            Ok(value) => {
                counter!("jha_cms_request_total", "outcome" => "ok").increment(1);
                value
            }
            Err(err) => {
                counter!("jha_cms_request_total", "outcome" => "error").increment(1);
                warn!(error = %err, "content store query failed");
                return Err(err.into());
            }
        };

        let decoded = decode(request.name, &value)?;
        self.cache.store_query(key, value, &request.tags, observed);
        Ok(decoded)
    }
}

fn decode<T: DeserializeOwned>(name: &'static str, value: &Value) -> Result<T, FetchError> {
    T::deserialize(value).map_err(|err| FetchError::Decode {
        name,
        message: err.to_string(),
    })
}
