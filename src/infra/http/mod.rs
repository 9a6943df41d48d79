mod middleware;
mod public;
mod revalidate;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::HttpState;
pub use revalidate::{REVALIDATE_PATH, RevalidateState};

use axum::Router;
use axum::extract::FromRef;
use axum::middleware as axum_middleware;

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub revalidate: RevalidateState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for RevalidateState {
    fn from_ref(state: &RouterState) -> Self {
        state.revalidate.clone()
    }
}

/// Public pages plus the revalidation webhook, with request context and
/// response logging on every route.
pub fn build_router(state: RouterState) -> Router {
    public::routes(&state)
        .merge(revalidate::routes())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
