//! Invalidation primitives consumed by the revalidation webhook.

use async_trait::async_trait;
use thiserror::Error;

use super::site::SiteCache;

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("failed to invalidate tag `{tag}`: {reason}")]
    Tag { tag: String, reason: String },
    #[error("failed to invalidate path `{path}`: {reason}")]
    Path { path: String, reason: String },
}

/// Drops cached data so the next request rebuilds it from the CMS.
///
/// Both operations are idempotent: an unknown or already invalidated key is
/// a successful no-op.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate every cached entry carrying `tag`. Returns the number of
    /// entries dropped.
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, InvalidationError>;

    /// Invalidate every cached response of the page at `path`.
    async fn invalidate_path(&self, path: &str) -> Result<usize, InvalidationError>;
}

#[async_trait]
impl CacheInvalidator for SiteCache {
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, InvalidationError> {
        Ok(self.purge_tag(tag))
    }

    async fn invalidate_path(&self, path: &str) -> Result<usize, InvalidationError> {
        Ok(self.purge_path(path))
    }
}
