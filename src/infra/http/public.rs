use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{
        content::ContentService,
        error::{AppError, HttpError},
        sitemap::SitemapService,
    },
    cache::{SiteCache, response_cache_layer},
    domain::{content::GeneralPageKey, slug::normalize_slug_param},
    presentation::pages::PageRenderer,
};

use super::RouterState;

#[derive(Clone)]
pub struct HttpState {
    pub content: ContentService,
    pub sitemap: Arc<SitemapService>,
    pub pages: Arc<PageRenderer>,
    pub cache: Arc<SiteCache>,
}

pub(super) fn routes(state: &RouterState) -> Router<RouterState> {
    // Pages built from CMS content; served through the response cache.
    let cached_routes = Router::new()
        .route("/", get(home))
        .route("/news", get(news_index))
        .route("/news/{slug}", get(news_detail))
        .route("/programs", get(programs_index))
        .route("/programs/{slug}", get(program_detail))
        .route("/coop", get(coop_index))
        .route("/coop/{slug}", get(coop_detail))
        .route("/activities", get(activities))
        .route("/admissions", get(admissions))
        .route("/about", get(about))
        .route("/faq", get(faq))
        .route("/gallery", get(gallery))
        .route("/alumni", get(alumni))
        .route("/sitemap.xml", get(sitemap))
        .fallback(fallback_router)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.http.cache),
            response_cache_layer,
        ));

    let static_routes = Router::new()
        .route("/_health", get(health))
        .route("/robots.txt", get(robots_txt))
        .route("/static/{*path}", get(crate::infra::assets::serve_static));

    cached_routes.merge(static_routes)
}

async fn home(State(state): State<HttpState>) -> Response {
    match state.content.home_page().await {
        Ok(page) => state.pages.home(page),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn news_index(State(state): State<HttpState>) -> Response {
    match state.content.posts().await {
        Ok(posts) => state.pages.news(posts),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn news_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let Some(slug) = normalize_slug_param(Some(&slug)) else {
        return state.pages.not_found();
    };
    match state.content.post(&slug).await {
        Ok(post) => state.pages.post(&slug, post),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn programs_index(State(state): State<HttpState>) -> Response {
    match state.content.programs().await {
        Ok(programs) => state.pages.programs(programs),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn program_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let Some(slug) = normalize_slug_param(Some(&slug)) else {
        return state.pages.not_found();
    };
    match state.content.program(&slug).await {
        Ok(program) => state.pages.program(&slug, program),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn coop_index(State(state): State<HttpState>) -> Response {
    match state.content.coops().await {
        Ok(coops) => state.pages.coops(coops),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn coop_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let Some(slug) = normalize_slug_param(Some(&slug)) else {
        return state.pages.not_found();
    };
    match state.content.coop(&slug).await {
        Ok(coop) => state.pages.coop(&slug, coop),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn activities(State(state): State<HttpState>) -> Response {
    match state.content.activities().await {
        Ok(activities) => state.pages.activities(activities),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn admissions(State(state): State<HttpState>) -> Response {
    match state.content.admissions_page().await {
        Ok(page) => state.pages.admissions(page),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn about(State(state): State<HttpState>) -> Response {
    general_page(state, GeneralPageKey::About).await
}

async fn faq(State(state): State<HttpState>) -> Response {
    general_page(state, GeneralPageKey::Faq).await
}

async fn gallery(State(state): State<HttpState>) -> Response {
    general_page(state, GeneralPageKey::Gallery).await
}

async fn alumni(State(state): State<HttpState>) -> Response {
    general_page(state, GeneralPageKey::Alumni).await
}

async fn general_page(state: HttpState, key: GeneralPageKey) -> Response {
    match state.content.general_page(key).await {
        Ok(page) => state.pages.general_page(key, page),
        Err(err) => state.pages.error(err.into()),
    }
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(xml) => {
            let mut response = xml.into_response();
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            );
            response
        }
        Err(err) => {
            let err = AppError::from(err);
            HttpError::from_error(
                "infra::http::public::sitemap",
                err.status_code(),
                "Sitemap unavailable",
                &err,
            )
            .into_response()
        }
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    let mut response = state.sitemap.robots_txt().into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback_router(State(state): State<HttpState>) -> Response {
    state.pages.not_found()
}
