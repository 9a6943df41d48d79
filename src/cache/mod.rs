//! Site cache.
//!
//! Two layers bound together by cache tags:
//!
//! - **Query cache**: raw CMS query results, tagged by the caller
//! - **Response cache**: rendered GET responses, tagged with every tag the
//!   content layer read while rendering them
//!
//! Invalidating a tag drops both kinds of entries; invalidating a path drops
//! every cached response for that page. Configured via the `[cache]`
//! settings section:
//!
//! ```toml
//! [cache]
//! enable_query_cache = true
//! enable_response_cache = true
//! query_limit = 512
//! response_limit = 256
//! # query_ttl_seconds / response_ttl_seconds default by site environment
//! ```

mod config;
mod epoch;
pub mod deps;
mod invalidate;
mod keys;
mod lock;
mod middleware;
mod registry;
mod site;
mod store;

pub use config::{CacheConfig, DEVELOPMENT_TTL_SECONDS, PRODUCTION_TTL_SECONDS, default_ttl};
pub use epoch::{Epoch, PurgeLog};
pub use invalidate::{CacheInvalidator, InvalidationError};
pub use keys::{CacheKey, CacheTag, QueryKey, ResponseKey, hash_query, hash_value, normalize_path};
pub use middleware::{CACHE_STATUS_HEADER, response_cache_layer};
pub use registry::TagRegistry;
pub use site::SiteCache;
pub use store::{CachedResponse, QueryStore, ResponseStore};
