//! Cache configuration.
//!
//! Controls the query cache (CMS results) and the response cache (rendered
//! pages). Built from the `[cache]` settings section.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheSettings, SiteEnvironment};

const DEFAULT_QUERY_LIMIT: usize = 512;
const DEFAULT_RESPONSE_LIMIT: usize = 256;
const DEFAULT_RESPONSE_BODY_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Seconds a fetched result stays fresh while developing locally.
pub const DEVELOPMENT_TTL_SECONDS: u64 = 30;
/// Seconds a fetched result stays fresh in production.
pub const PRODUCTION_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache CMS query results.
    pub enable_query_cache: bool,
    /// Cache rendered GET responses.
    pub enable_response_cache: bool,
    /// Maximum query results held at once.
    pub query_limit: usize,
    /// Maximum rendered responses held at once.
    pub response_limit: usize,
    /// Responses with a larger body are served but never stored.
    pub response_body_limit_bytes: usize,
    pub query_ttl: Duration,
    pub response_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::for_environment(SiteEnvironment::Production)
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enable_query_cache: settings.enable_query_cache,
            enable_response_cache: settings.enable_response_cache,
            query_limit: settings.query_limit,
            response_limit: settings.response_limit,
            response_body_limit_bytes: settings.response_body_limit_bytes,
            query_ttl: settings.query_ttl,
            response_ttl: settings.response_ttl,
        }
    }
}

impl CacheConfig {
    /// Defaults for the given deployment environment.
    pub fn for_environment(environment: SiteEnvironment) -> Self {
        let ttl = default_ttl(environment);
        Self {
            enable_query_cache: true,
            enable_response_cache: true,
            query_limit: DEFAULT_QUERY_LIMIT,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            response_body_limit_bytes: DEFAULT_RESPONSE_BODY_LIMIT_BYTES,
            query_ttl: ttl,
            response_ttl: ttl,
        }
    }

    /// Query limit as NonZeroUsize, clamping to 1 if zero.
    pub fn query_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.query_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Freshness window applied when no explicit TTL is configured.
pub fn default_ttl(environment: SiteEnvironment) -> Duration {
    match environment {
        SiteEnvironment::Development => Duration::from_secs(DEVELOPMENT_TTL_SECONDS),
        SiteEnvironment::Production => Duration::from_secs(PRODUCTION_TTL_SECONDS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults() {
        let config = CacheConfig::default();
        assert!(config.enable_query_cache);
        assert!(config.enable_response_cache);
        assert_eq!(config.query_limit, 512);
        assert_eq!(config.response_limit, 256);
        assert_eq!(config.query_ttl, Duration::from_secs(3600));
        assert_eq!(config.response_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn development_uses_short_ttl() {
        let config = CacheConfig::for_environment(SiteEnvironment::Development);
        assert_eq!(config.query_ttl, Duration::from_secs(30));
        assert_eq!(config.response_ttl, Duration::from_secs(30));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            query_limit: 0,
            response_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.query_limit_non_zero().get(), 1);
        assert_eq!(config.response_limit_non_zero().get(), 1);
    }
}
