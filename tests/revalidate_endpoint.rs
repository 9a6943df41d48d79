use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use jha_site::{
    application::{
        content::ContentService,
        fetch::ContentFetcher,
        repos::{ContentStore, ContentStoreError, QueryParams},
        revalidate::{RevalidationService, SECRET_HEADER},
        sitemap::SitemapService,
    },
    cache::{CacheInvalidator, InvalidationError, SiteCache},
    config::{SiteEnvironment, SiteSettings},
    infra::{
        http::{self, HttpState, REVALIDATE_PATH, RevalidateState, RouterState},
        sanity::ImageUrlBuilder,
    },
    presentation::pages::PageRenderer,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

const SECRET: &str = "abc123";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Tag(String),
    Path(String),
}

#[derive(Default)]
struct RecordingInvalidator {
    calls: Mutex<Vec<Call>>,
    fail_tag: Option<&'static str>,
}

impl RecordingInvalidator {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, InvalidationError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call::Tag(tag.to_string()));
        if self.fail_tag == Some(tag) {
            return Err(InvalidationError::Tag {
                tag: tag.to_string(),
                reason: "backend unavailable".to_string(),
            });
        }
        Ok(1)
    }

    async fn invalidate_path(&self, path: &str) -> Result<usize, InvalidationError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call::Path(path.to_string()));
        Ok(1)
    }
}

struct NoContent;

#[async_trait]
impl ContentStore for NoContent {
    async fn query(&self, _query: &str, _params: &QueryParams) -> Result<Value, ContentStoreError> {
        Ok(Value::Null)
    }
}

fn router(secret: Option<&str>, invalidator: Arc<RecordingInvalidator>) -> Router {
    let cache = Arc::new(SiteCache::default());
    let site = SiteSettings {
        base_url: Url::parse("https://jha.example").expect("base url"),
        name: "JHA (Korea)".to_string(),
        environment: SiteEnvironment::Production,
    };
    let content = ContentService::new(ContentFetcher::new(Arc::new(NoContent), Arc::clone(&cache)));

    http::build_router(RouterState {
        http: HttpState {
            content: content.clone(),
            sitemap: Arc::new(SitemapService::new(content, site.clone())),
            pages: Arc::new(PageRenderer::new(
                site,
                ImageUrlBuilder::new("project", "production"),
            )),
            cache,
        },
        revalidate: RevalidateState {
            service: Arc::new(RevalidationService::new(
                secret.map(str::to_string),
                invalidator,
            )),
        },
    })
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router response")
}

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn post_with_header_secret_invalidates_tags_and_paths() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let body = r#"{"tag":"post","paths":["/news"]}"#;
    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(body))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["revalidated"], json!(true));
    assert_eq!(payload["tags"], json!(["post"]));
    assert_eq!(payload["paths"], json!(["/news"]));
    assert!(payload["timestamp"].is_i64());

    let calls = invalidator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.contains(&Call::Tag("post".to_string())));
    assert!(calls.contains(&Call::Path("/news".to_string())));
}

#[tokio::test]
async fn single_and_list_keys_are_merged_without_duplicates() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let body = r#"{"tag":"post","tags":["post","",null,"program"],"path":"/","paths":["/"]}"#;
    let request = post(&format!("{REVALIDATE_PATH}?secret={SECRET}"))
        .body(Body::from(body))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["tags"], json!(["post", "program"]));
    assert_eq!(payload["paths"], json!(["/"]));
    assert_eq!(invalidator.calls().len(), 3);
}

#[tokio::test]
async fn query_secret_takes_precedence_over_header() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let body = r#"{"tag":"post"}"#;
    let request = post(&format!("{REVALIDATE_PATH}?secret=wrong"))
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(body))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Invalid secret"}));
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn missing_secret_is_unauthorized() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .body(Body::from(r#"{"tag":"post"}"#))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn unconfigured_secret_refuses_every_caller() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(None, invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(r#"{"tag":"post"}"#))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Revalidation secret not configured"})
    );
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from("{not json"))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid JSON payload"}));
}

#[tokio::test]
async fn request_without_keys_is_a_bad_request() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(r#"{"tags":[],"path":""}"#))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Provide at least one tag or path."})
    );
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn declared_empty_body_is_treated_as_no_keys() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .header(header::CONTENT_LENGTH, "0")
        .body(Body::empty())
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Provide at least one tag or path."})
    );
}

#[tokio::test]
async fn oversized_body_is_rejected_only_after_the_secret_check() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());
    let oversized = format!(r#"{{"tag":"{}"}}"#, "p".repeat(3 * 1024 * 1024));

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, "wrong")
        .body(Body::from(oversized.clone()))
        .expect("request");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Invalid secret"}));

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(oversized))
        .expect("request");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn invalidation_failure_is_a_server_error() {
    let invalidator = Arc::new(RecordingInvalidator {
        fail_tag: Some("program"),
        ..Default::default()
    });
    let router = router(Some(SECRET), invalidator.clone());

    let request = post(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(r#"{"tags":["post","program"]}"#))
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // Every requested key is attempted even when one of them fails.
    assert_eq!(invalidator.calls().len(), 2);
}

#[tokio::test]
async fn get_reports_readiness_without_invalidating() {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let router = router(Some(SECRET), invalidator.clone());

    let request = Request::get(format!("{REVALIDATE_PATH}?secret={SECRET}"))
        .body(Body::empty())
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["ok"], json!(true));
    assert!(payload["message"].is_string());
    assert!(payload["timestamp"].is_i64());
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn get_requires_the_secret() {
    let router = router(Some(SECRET), Arc::new(RecordingInvalidator::default()));

    let request = Request::get(REVALIDATE_PATH)
        .header(SECRET_HEADER, "nope")
        .body(Body::empty())
        .expect("request");
    assert_eq!(send(&router, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn options_needs_no_secret_and_lists_allowed_methods() {
    let router = router(None, Arc::new(RecordingInvalidator::default()));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(REVALIDATE_PATH)
        .body(Body::empty())
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ALLOW], "POST, GET, OPTIONS");
}

#[tokio::test]
async fn other_methods_are_rejected_with_allow_header() {
    let router = router(Some(SECRET), Arc::new(RecordingInvalidator::default()));

    let request = Request::builder()
        .method(Method::PUT)
        .uri(REVALIDATE_PATH)
        .header(SECRET_HEADER, SECRET)
        .body(Body::empty())
        .expect("request");
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST, GET, OPTIONS");
}

#[tokio::test]
async fn webhook_responses_are_never_cached() {
    let router = router(Some(SECRET), Arc::new(RecordingInvalidator::default()));

    let request = Request::get(format!("{REVALIDATE_PATH}?secret={SECRET}"))
        .body(Body::empty())
        .expect("request");
    let response = send(&router, request).await;

    assert!(!response.headers().contains_key("x-cache"));
}
