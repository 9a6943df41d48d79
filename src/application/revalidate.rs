//! CMS publish webhook: authenticate, normalize the requested tags and
//! paths, and invalidate them.

use std::sync::Arc;

use axum::http::StatusCode;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::cache::{CacheInvalidator, InvalidationError};

use super::error::HttpError;

/// Query parameter carrying the shared secret. Takes precedence over the header.
pub const SECRET_QUERY_PARAM: &str = "secret";
/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "x-revalidate-secret";
/// Methods served by the webhook route.
pub const ALLOWED_METHODS: &str = "POST, GET, OPTIONS";

const LOG_TARGET: &str = "jha_site::revalidate";
const READY_MESSAGE: &str = "Revalidate endpoint ready. Use POST to trigger.";

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("revalidation secret is not configured")]
    NotConfigured,
    #[error("caller secret is missing or does not match")]
    InvalidSecret,
    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(String),
    #[error("payload names no tag or path")]
    EmptyRequest,
    #[error(transparent)]
    Invalidation(#[from] InvalidationError),
}

impl RevalidateError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured | Self::Invalidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidSecret => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) | Self::EmptyRequest => StatusCode::BAD_REQUEST,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Revalidation secret not configured",
            Self::InvalidSecret => "Invalid secret",
            Self::InvalidPayload(_) => "Invalid JSON payload",
            Self::EmptyRequest => "Provide at least one tag or path.",
            Self::Invalidation(_) => "Revalidation failed",
        }
    }
}

impl From<RevalidateError> for HttpError {
    fn from(err: RevalidateError) -> Self {
        HttpError::from_error(
            "application::revalidate",
            err.status(),
            err.public_message(),
            &err,
        )
        .json()
    }
}

/// Webhook body. Unknown fields are ignored; `null` counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InvalidationRequest {
    pub tag: Option<String>,
    pub tags: Option<Vec<Option<String>>>,
    pub path: Option<String>,
    pub paths: Option<Vec<Option<String>>>,
}

/// Deduplicated tags and paths to invalidate, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationKeys {
    pub tags: Vec<String>,
    pub paths: Vec<String>,
}

impl InvalidationKeys {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.paths.is_empty()
    }
}

impl From<&InvalidationRequest> for InvalidationKeys {
    fn from(request: &InvalidationRequest) -> Self {
        Self {
            tags: normalize_keys(request.tag.as_deref(), flatten(&request.tags)),
            paths: normalize_keys(request.path.as_deref(), flatten(&request.paths)),
        }
    }
}

fn flatten(values: &Option<Vec<Option<String>>>) -> impl Iterator<Item = &str> {
    values
        .iter()
        .flatten()
        .filter_map(|value| value.as_deref())
}

/// Merge a singular value and a list into an ordered list without empty or
/// repeated entries. The singular value comes first.
pub fn normalize_keys<'a>(
    single: Option<&'a str>,
    multiple: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for value in single.into_iter().chain(multiple) {
        if !value.is_empty() && !keys.iter().any(|existing| existing == value) {
            keys.push(value.to_string());
        }
    }
    keys
}

/// Decode a webhook body.
///
/// With `declared_empty` (the request said `content-length: 0`) the body is
/// not inspected. A JSON value that is not an object carries no keys.
pub fn parse_payload(declared_empty: bool, body: &[u8]) -> Result<InvalidationRequest, RevalidateError> {
    if declared_empty {
        return Ok(InvalidationRequest::default());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|err| RevalidateError::InvalidPayload(err.to_string()))?;

    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|err| RevalidateError::InvalidPayload(err.to_string())),
        _ => Ok(InvalidationRequest::default()),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RevalidationReceipt {
    pub revalidated: bool,
    pub tags: Vec<String>,
    pub paths: Vec<String>,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReadinessReceipt {
    pub ok: bool,
    pub message: &'static str,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

pub struct RevalidationService {
    secret: Option<String>,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl RevalidationService {
    /// An empty secret is treated as unconfigured.
    pub fn new(secret: Option<String>, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        let secret = secret.filter(|secret| !secret.is_empty());
        if secret.is_none() {
            warn!(
                target: LOG_TARGET,
                "revalidation secret is not configured; webhook calls will be refused"
            );
        }
        Self {
            secret,
            invalidator,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the caller's secret. A missing server secret fails closed
    /// regardless of what the caller sent.
    pub fn authorize(&self, provided: Option<&str>) -> Result<(), RevalidateError> {
        let expected = self.secret.as_deref().ok_or(RevalidateError::NotConfigured)?;
        let provided = provided.ok_or(RevalidateError::InvalidSecret)?;
        if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(RevalidateError::InvalidSecret)
        }
    }

    /// Readiness check for the CMS webhook configuration screen.
    pub fn readiness(&self, provided: Option<&str>) -> Result<ReadinessReceipt, RevalidateError> {
        self.authorize(provided)?;
        Ok(ReadinessReceipt {
            ok: true,
            message: READY_MESSAGE,
            timestamp: now_millis(),
        })
    }

    /// Full webhook flow: authorize, parse, normalize, invalidate.
    pub async fn revalidate(
        &self,
        provided: Option<&str>,
        declared_empty: bool,
        body: &[u8],
    ) -> Result<RevalidationReceipt, RevalidateError> {
        self.authorize(provided)?;
        let request = parse_payload(declared_empty, body)?;
        let keys = InvalidationKeys::from(&request);
        if keys.is_empty() {
            return Err(RevalidateError::EmptyRequest);
        }
        self.invalidate(keys).await
    }

    /// Issue every tag and path invalidation concurrently and wait for all
    /// of them. Completed invalidations stay in effect when another fails.
    pub async fn invalidate(
        &self,
        keys: InvalidationKeys,
    ) -> Result<RevalidationReceipt, RevalidateError> {
        let tag_calls = keys
            .tags
            .iter()
            .map(|tag| self.invalidator.invalidate_tag(tag));
        let path_calls = keys
            .paths
            .iter()
            .map(|path| self.invalidator.invalidate_path(path));

        let outcomes = join_all(tag_calls.chain(path_calls)).await;

        let mut removed = 0;
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(count) => removed += count,
                Err(err) => {
                    warn!(target: LOG_TARGET, error = %err, "invalidation failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err.into());
        }

        info!(
            target: LOG_TARGET,
            tags = keys.tags.len(),
            paths = keys.paths.len(),
            removed,
            "revalidated cache"
        );

        Ok(RevalidationReceipt {
            revalidated: true,
            tags: keys.tags,
            paths: keys.paths,
            timestamp: now_millis(),
        })
    }
}

fn now_millis() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}
