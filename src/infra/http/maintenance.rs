//! Maintenance gate.
//!
//! Runs in front of every route. For each request, in order:
//!
//! 1. excluded paths (health, the maintenance page, static roots) always pass;
//! 2. a forced maintenance switch short-circuits without probing the CMS;
//! 3. otherwise the CMS health check decides.
//!
//! Nothing is sticky: both the switch and CMS health are read per request, and
//! only the health monitor's own TTL caches anything.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, RETRY_AFTER},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::debug;

use crate::{application::error::ErrorReport, infra::cms::HealthCheck};

pub const MAINTENANCE_PATH: &str = "/maintenance";
const RETRY_AFTER_SECS: &str = "30";

/// Prefixes that stay reachable during an outage.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    "/_health",
    "/health",
    MAINTENANCE_PATH,
    "/static",
    "/css",
    "/js",
    "/lib",
    "/images",
    "/favicon.ico",
    "/robots.txt",
];

/// Runtime switch for forced maintenance, seeded from configuration.
#[derive(Debug, Default)]
pub struct MaintenanceSwitch {
    enabled: AtomicBool,
}

impl MaintenanceSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Set the switch and return the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceReason {
    Forced,
    CmsUnavailable,
}

impl MaintenanceReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::CmsUnavailable => "cms_unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Maintenance(MaintenanceReason),
}

#[derive(Clone)]
pub struct MaintenanceGate {
    switch: Arc<MaintenanceSwitch>,
    health: Arc<dyn HealthCheck>,
    excluded: Arc<[String]>,
}

impl MaintenanceGate {
    pub fn new(
        switch: Arc<MaintenanceSwitch>,
        health: Arc<dyn HealthCheck>,
        excluded: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            switch,
            health,
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn with_default_exclusions(
        switch: Arc<MaintenanceSwitch>,
        health: Arc<dyn HealthCheck>,
    ) -> Self {
        Self::new(
            switch,
            health,
            DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| p.to_string()),
        )
    }

    pub fn switch(&self) -> &Arc<MaintenanceSwitch> {
        &self.switch
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded
            .iter()
            .any(|prefix| matches_prefix(path, prefix))
    }

    pub async fn evaluate(&self, path: &str) -> GateDecision {
        if self.is_excluded(path) {
            return GateDecision::Pass;
        }

        if self.switch.is_enabled() {
            return GateDecision::Maintenance(MaintenanceReason::Forced);
        }

        if self.health.is_available().await {
            GateDecision::Pass
        } else {
            GateDecision::Maintenance(MaintenanceReason::CmsUnavailable)
        }
    }
}

/// Segment-aware, case-insensitive prefix match: `/static` covers
/// `/static` and `/static/site.css` but not `/staticky`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }

    let (head, rest) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix) && (rest.is_empty() || rest.starts_with('/'))
}

pub async fn maintenance_gate(
    State(gate): State<MaintenanceGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match gate.evaluate(request.uri().path()).await {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Maintenance(reason) => {
            counter!("vitrine_maintenance_rejected_total", "reason" => reason.as_str())
                .increment(1);
            debug!(
                target = "vitrine::http::maintenance",
                path = %request.uri().path(),
                reason = reason.as_str(),
                "request short-circuited by maintenance gate"
            );
            maintenance_response(reason)
        }
    }
}

fn maintenance_response(reason: MaintenanceReason) -> Response {
    let mut response = (
        StatusCode::SERVICE_UNAVAILABLE,
        [
            (LOCATION, HeaderValue::from_static(MAINTENANCE_PATH)),
            (RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS)),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
        ],
        "Service temporarily unavailable",
    )
        .into_response();
    ErrorReport::from_message(
        "infra::http::maintenance",
        StatusCode::SERVICE_UNAVAILABLE,
        format!("maintenance gate tripped: {}", reason.as_str()),
    )
    .attach(&mut response);
    response
}
