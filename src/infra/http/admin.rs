//! Operator surface on the admin listener: forced maintenance, cache purge,
//! and on-demand CMS probes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{cache::ResponseCache, infra::cms::CmsHealthMonitor};

use super::{
    HealthStateView, health_view,
    maintenance::MaintenanceSwitch,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub switch: Arc<MaintenanceSwitch>,
    pub cache: Arc<ResponseCache>,
    pub health: Arc<CmsHealthMonitor>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/maintenance", get(maintenance_status).put(set_maintenance))
        .route("/cache", delete(purge_cache))
        .route("/_health", get(liveness))
        .route("/_health/cms", get(cms_health))
        .route("/_health/cms/refresh", post(refresh_cms_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceStatus {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePurged {
    pub removed: usize,
}

async fn maintenance_status(State(state): State<AdminState>) -> Json<MaintenanceStatus> {
    Json(MaintenanceStatus {
        enabled: state.switch.is_enabled(),
    })
}

async fn set_maintenance(
    State(state): State<AdminState>,
    Json(body): Json<MaintenanceStatus>,
) -> Json<MaintenanceStatus> {
    let previous = state.switch.set(body.enabled);
    if previous != body.enabled {
        info!(
            target = "vitrine::admin",
            enabled = body.enabled,
            "forced maintenance toggled"
        );
    }
    Json(body)
}

async fn purge_cache(State(state): State<AdminState>) -> Json<CachePurged> {
    let removed = state.cache.len();
    state.cache.clear();
    info!(target = "vitrine::admin", removed, "response cache purged");
    Json(CachePurged { removed })
}

async fn liveness() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cms_health(State(state): State<AdminState>) -> Json<HealthStateView> {
    Json(health_view(&state.health.state()))
}

async fn refresh_cms_health(State(state): State<AdminState>) -> Json<HealthStateView> {
    Json(health_view(&state.health.refresh().await))
}
