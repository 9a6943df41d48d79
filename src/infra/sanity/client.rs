use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::application::repos::{ContentStore, ContentStoreError, QueryParams};
use crate::config::CmsSettings;
use crate::infra::error::InfraError;

const USER_AGENT: &str = concat!("jha-site/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the CMS query API.
#[derive(Clone)]
pub struct SanityClient {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

impl SanityClient {
    pub fn new(settings: &CmsSettings) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: query_endpoint(settings)?,
            token: settings.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Query URL with the GROQ text and every parameter as `$name=<json>`.
    pub fn query_url(&self, query: &str, params: &QueryParams) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params.iter() {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    #[instrument(skip_all)]
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentStoreError> {
        let url = self.query_url(query, params);
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(transport_error);
        histogram!("jha_cms_request_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        let response = response?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            counter!("jha_cms_error_status_total", "status" => status.as_u16().to_string())
                .increment(1);
            return Err(ContentStoreError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let decoded: QueryResponse = serde_json::from_str(&body)
            .map_err(|err| ContentStoreError::Malformed(err.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "cms query completed");
        Ok(decoded.result)
    }
}

fn query_endpoint(settings: &CmsSettings) -> Result<Url, InfraError> {
    let origin = match &settings.api_base_url {
        Some(base) => base.as_str().trim_end_matches('/').to_string(),
        None => {
            let host = if settings.use_cdn { "apicdn" } else { "api" };
            format!("https://{}.{host}.sanity.io", settings.project_id)
        }
    };
    let endpoint = format!(
        "{origin}/v{}/data/query/{}",
        settings.api_version, settings.dataset
    );
    Url::parse(&endpoint).map_err(|err| {
        InfraError::configuration(format!("invalid cms endpoint `{endpoint}`: {err}"))
    })
}

fn transport_error(err: reqwest::Error) -> ContentStoreError {
    if err.is_timeout() {
        ContentStoreError::Timeout
    } else {
        ContentStoreError::Transport(err.to_string())
    }
}

/// Best-effort message from a CMS error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
        message: Option<String>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        description: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(description) = parsed.error.and_then(|error| error.description) {
            return description;
        }
        if let Some(message) = parsed.message {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
