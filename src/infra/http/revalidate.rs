use std::sync::Arc;

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{RawQuery, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use url::form_urlencoded;

use crate::application::{
    error::{ErrorReport, HttpError},
    revalidate::{ALLOWED_METHODS, RevalidationService, SECRET_HEADER, SECRET_QUERY_PARAM},
};

use super::RouterState;

pub const REVALIDATE_PATH: &str = "/api/revalidate";
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct RevalidateState {
    pub service: Arc<RevalidationService>,
}

/// Never wrapped by the response cache.
pub(super) fn routes() -> Router<RouterState> {
    Router::new().route(
        REVALIDATE_PATH,
        post(revalidate)
            .get(readiness)
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

/// The body is read only after the caller is authorized.
async fn revalidate(State(state): State<RevalidateState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let secret = provided_secret(parts.uri.query(), &parts.headers);
    if let Err(err) = state.service.authorize(secret.as_deref()) {
        return HttpError::from(err).into_response();
    }

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            return HttpError::from_error(
                "infra::http::revalidate",
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload too large",
                &err,
            )
            .json()
            .into_response();
        }
    };

    match state
        .service
        .revalidate(secret.as_deref(), declares_empty_body(&parts.headers), &body)
        .await
    {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn readiness(
    State(state): State<RevalidateState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let secret = provided_secret(query.as_deref(), &headers);
    match state.service.readiness(secret.as_deref()) {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn preflight() -> Response {
    with_allow(StatusCode::NO_CONTENT.into_response())
}

async fn method_not_allowed() -> Response {
    let mut response = with_allow(StatusCode::METHOD_NOT_ALLOWED.into_response());
    ErrorReport::from_message(
        "infra::http::revalidate",
        StatusCode::METHOD_NOT_ALLOWED,
        "unsupported method",
    )
    .attach(&mut response);
    response
}

fn with_allow(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// The `secret` query parameter wins over the header, even when empty.
fn provided_secret(query: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(query) = query
        && let Some((_, value)) = form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == SECRET_QUERY_PARAM)
    {
        return Some(value.into_owned());
    }

    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn declares_empty_body(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0")
}
