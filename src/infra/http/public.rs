use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        catalog::{CatalogService, HomeViewModel, ProductListViewModel},
        error::ErrorReport,
    },
    infra::{assets, cms::CmsHealthMonitor},
};

use super::{
    health_view,
    maintenance::{MAINTENANCE_PATH, MaintenanceGate, maintenance_gate},
    middleware::{log_responses, set_request_context},
};

const MAINTENANCE_PAGE: &str = "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Down for maintenance</title><link rel=\"stylesheet\" href=\"/static/site.css\"></head>\n<body><main><h1>We'll be right back</h1><p>The shop is temporarily unavailable. Please try again in a few minutes.</p></main></body>\n</html>\n";
const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /maintenance\n";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub health: Arc<CmsHealthMonitor>,
}

/// Public router. The maintenance gate wraps every route, including the
/// fallback, and sits inside the logging layers so short-circuits are logged.
pub fn build_router(state: HttpState, gate: MaintenanceGate) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/products", get(products))
        .route(MAINTENANCE_PATH, get(maintenance_page))
        .route("/_health", get(liveness))
        .route("/_health/cms", get(cms_health))
        .route("/robots.txt", get(robots_txt))
        .route("/favicon.ico", get(favicon))
        .route("/static/{*path}", get(assets::serve_static))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(gate, maintenance_gate))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
}

async fn home(State(state): State<HttpState>) -> Json<HomeViewModel> {
    Json(state.catalog.overview().await)
}

async fn products(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Json<ProductListViewModel> {
    Json(state.catalog.products(query.page.unwrap_or(1)).await)
}

async fn maintenance_page() -> Response {
    (
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        MAINTENANCE_PAGE,
    )
        .into_response()
}

async fn liveness() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cms_health(State(state): State<HttpState>) -> Response {
    let view = health_view(&state.health.state());
    if view.is_available {
        return Json(view).into_response();
    }

    let failures = view.consecutive_failures;
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(view)).into_response();
    ErrorReport::from_message(
        "infra::http::public::cms_health",
        StatusCode::SERVICE_UNAVAILABLE,
        format!("CMS unavailable after {failures} consecutive failed probes"),
    )
    .attach(&mut response);
    response
}

async fn robots_txt() -> Response {
    (
        [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        ROBOTS_TXT,
    )
        .into_response()
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
