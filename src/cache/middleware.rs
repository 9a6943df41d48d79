//! Response cache middleware.
//!
//! Serves cached GET responses for the routes it wraps and stores fresh 200
//! responses together with the cache tags recorded while rendering them.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{SiteCache, deps, keys::ResponseKey, store::CachedResponse};

/// Header reporting whether a response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<Arc<SiteCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config().enable_response_cache || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::new(request.uri().path(), request.uri().query());
    let refresh = wants_refresh(request.headers());

    if !refresh && let Some(cached) = cache.lookup_response(&key) {
        debug!(cache = "response", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(
        cache = "response",
        outcome = if refresh { "refresh" } else { "miss" },
        "executing handler"
    );

    let observed = cache.observe();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK || !is_storable(response.headers()) {
        return mark(response, "MISS");
    }

    let limit = cache.config().response_body_limit_bytes;
    if !fits_limit(&response, limit) {
        debug!(cache = "response", limit, "body too large or unsized; serving without caching");
        return mark(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, limit, "response body could not be buffered for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    debug!(cache = "response", tags = tags.len(), "caching response");
    cache.store_response(key, cached, tags, observed);

    mark(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// `cache-control: no-cache` (or `pragma: no-cache`) asks for a fresh render.
fn wants_refresh(headers: &HeaderMap) -> bool {
    let has_no_cache = |name: header::HeaderName| {
        headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.to_ascii_lowercase().contains("no-cache"))
    };
    has_no_cache(header::CACHE_CONTROL) || has_no_cache(header::PRAGMA)
}

/// Only bodies whose size is known up front and within `limit` are buffered.
fn fits_limit(response: &Response, limit: usize) -> bool {
    let declared = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let upper = declared.or_else(|| response.body().size_hint().upper());
    upper.is_some_and(|size| size <= limit as u64)
}

/// Handlers opt out with `cache-control: no-store` or `private`.
fn is_storable(headers: &HeaderMap) -> bool {
    !headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| {
            let value = value.to_ascii_lowercase();
            value.contains("no-store") || value.contains("private")
        })
}

fn mark(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    match builder.body(Body::from(cached.body)) {
        Ok(response) => mark(response, "HIT"),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
