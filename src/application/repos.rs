//! The content store seam: anything that can answer a GROQ query.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("content store request failed: {0}")]
    Transport(String),
    #[error("content store request timed out")]
    Timeout,
    #[error("content store responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content store response was malformed: {0}")]
    Malformed(String),
}

/// Named query parameters, sent as `$name=<json>`.
///
/// Ordered by name so that equal parameter sets always encode identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable JSON encoding used for cache keys.
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a read query and return the raw `result` value.
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentStoreError>;
}
