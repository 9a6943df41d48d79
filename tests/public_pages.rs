use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

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
        queries,
        repos::{ContentStore, ContentStoreError, QueryParams},
        revalidate::{RevalidationService, SECRET_HEADER},
        sitemap::SitemapService,
    },
    cache::{CACHE_STATUS_HEADER, CacheConfig, CacheInvalidator, SiteCache},
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

/// Answers the post queries from memory and counts every call.
#[derive(Default)]
struct InMemoryStore {
    calls: AtomicUsize,
    offline: AtomicBool,
    post_title: Mutex<String>,
}

impl InMemoryStore {
    fn with_title(title: &str) -> Self {
        let store = Self::default();
        store.set_title(title);
        store
    }

    fn set_title(&self, title: &str) {
        *self.post_title.lock().expect("title lock") = title.to_string();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn post(&self) -> Value {
        json!({
            "title": *self.post_title.lock().expect("title lock"),
            "slug": "hello-world",
            "publishedAt": "2025-03-01T09:00:00Z",
            "categories": ["Notice"],
            "body": [{
                "_type": "block",
                "_key": "b1",
                "style": "normal",
                "markDefs": [],
                "children": [{"_type": "span", "_key": "s1", "text": "Welcome aboard.", "marks": []}]
            }]
        })
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Transport("connection refused".to_string()));
        }

        if query == queries::POSTS {
            return Ok(json!([self.post()]));
        }
        if query == queries::POST {
            return Ok(match params.get("slug") {
                Some(Value::String(slug)) if slug == "hello-world" => self.post(),
                _ => Value::Null,
            });
        }
        Ok(Value::Null)
    }
}

struct Harness {
    router: Router,
    store: Arc<InMemoryStore>,
    cache: Arc<SiteCache>,
}

fn harness(store: InMemoryStore) -> Harness {
    let store = Arc::new(store);
    let cache = Arc::new(SiteCache::new(CacheConfig::default()));
    let site = SiteSettings {
        base_url: Url::parse("https://jha.example").expect("base url"),
        name: "JHA (Korea)".to_string(),
        environment: SiteEnvironment::Production,
    };

    let fetcher = ContentFetcher::new(store.clone(), Arc::clone(&cache));
    let content = ContentService::new(fetcher);
    let invalidator: Arc<dyn CacheInvalidator> = cache.clone();

    let state = RouterState {
        http: HttpState {
            content: content.clone(),
            sitemap: Arc::new(SitemapService::new(content, site.clone())),
            pages: Arc::new(PageRenderer::new(
                site,
                ImageUrlBuilder::new("project", "production"),
            )),
            cache: Arc::clone(&cache),
        },
        revalidate: RevalidateState {
            service: Arc::new(RevalidationService::new(
                Some(SECRET.to_string()),
                invalidator,
            )),
        },
    };

    Harness {
        router: http::build_router(state),
        store,
        cache,
    }
}

impl Harness {
    async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router response")
    }

    async fn revalidate(&self, body: Value) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(REVALIDATE_PATH)
            .header(SECRET_HEADER, SECRET)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

fn cache_status(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn second_request_is_served_from_the_response_cache() {
    let harness = harness(InMemoryStore::with_title("Spring term opens"));

    let first = harness.get("/news").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_status(&first), Some("MISS"));
    assert!(body_text(first).await.contains("Spring term opens"));

    let second = harness.get("/news").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cache_status(&second), Some("HIT"));
    assert_eq!(harness.store.calls(), 1);
}

#[tokio::test]
async fn tag_revalidation_rebuilds_pages_from_fresh_content() {
    let harness = harness(InMemoryStore::with_title("Spring term opens"));
    assert_eq!(harness.get("/news").await.status(), StatusCode::OK);
    assert_eq!(harness.get("/news/hello-world").await.status(), StatusCode::OK);
    let calls_before = harness.store.calls();

    harness.store.set_title("Spring term postponed");
    let response = harness.revalidate(json!({"tag": "post"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let listing = harness.get("/news").await;
    assert_eq!(cache_status(&listing), Some("MISS"));
    assert!(body_text(listing).await.contains("Spring term postponed"));

    let detail = harness.get("/news/hello-world").await;
    assert_eq!(cache_status(&detail), Some("MISS"));
    assert!(body_text(detail).await.contains("Spring term postponed"));
    assert_eq!(harness.store.calls(), calls_before + 2);
}

#[tokio::test]
async fn path_revalidation_drops_only_that_page() {
    let harness = harness(InMemoryStore::with_title("Spring term opens"));
    assert_eq!(harness.get("/news").await.status(), StatusCode::OK);
    assert_eq!(harness.get("/news/hello-world").await.status(), StatusCode::OK);

    let response = harness.revalidate(json!({"paths": ["/news/"]})).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(cache_status(&harness.get("/news").await), Some("MISS"));
    assert_eq!(
        cache_status(&harness.get("/news/hello-world").await),
        Some("HIT")
    );
    // The query cache still holds the listing, so the rebuild needs no fetch.
    assert_eq!(harness.store.calls(), 2);
}

#[tokio::test]
async fn unknown_slug_renders_not_found_and_is_not_cached() {
    let harness = harness(InMemoryStore::with_title("Spring term opens"));

    let response = harness.get("/news/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(cache_status(&response), Some("MISS"));
    assert_eq!(harness.cache.response_len(), 0);
}

#[tokio::test]
async fn unmatched_route_renders_not_found() {
    let harness = harness(InMemoryStore::default());

    let response = harness.get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("noindex"));
}

#[tokio::test]
async fn store_failure_renders_unavailable_page_and_caches_nothing() {
    let store = InMemoryStore::default();
    store.offline.store(true, Ordering::SeqCst);
    let harness = harness(store);

    let response = harness.get("/news").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(harness.cache.query_len(), 0);
    assert_eq!(harness.cache.response_len(), 0);

    harness.store.offline.store(false, Ordering::SeqCst);
    assert_eq!(harness.get("/news").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_and_robots_bypass_the_cache() {
    let harness = harness(InMemoryStore::default());

    let health = harness.get("/_health").await;
    assert_eq!(health.status(), StatusCode::NO_CONTENT);
    assert_eq!(cache_status(&health), None);

    let robots = harness.get("/robots.txt").await;
    assert_eq!(robots.status(), StatusCode::OK);
    assert_eq!(cache_status(&robots), None);
    assert!(
        body_text(robots)
            .await
            .contains("Sitemap: https://jha.example/sitemap.xml")
    );
}

#[tokio::test]
async fn sitemap_lists_static_routes_and_post_slugs() {
    let harness = harness(InMemoryStore::default());

    let response = harness.get("/sitemap.xml").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("<loc>https://jha.example/</loc>"));
    assert!(body.contains("<loc>https://jha.example/programs</loc>"));
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let harness = harness(InMemoryStore::default());

    let response = harness.get("/_health").await;
    assert!(response.headers().contains_key(http::REQUEST_ID_HEADER));
}
