use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use metrics_util::debugging::DebuggingRecorder;
use reqwest::Url;
use vitrine::cache::{CacheConfig, ResponseCache};
use vitrine::infra::cms::{
    CmsClient, CmsClientConfig, CmsError, CmsHealthMonitor, Endpoint, HealthCheck, LivenessProbe,
};
use vitrine::infra::http::maintenance::maintenance_gate;
use vitrine::infra::http::{MaintenanceGate, MaintenanceSwitch};
use tower::ServiceExt;

struct DownProbe;

#[async_trait]
impl LivenessProbe for DownProbe {
    async fn probe(&self) -> Result<(), CmsError> {
        Err(CmsError::Status {
            status: 502,
            body: String::new(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runtime_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Response cache hit/miss/evict/expire
    let cache = ResponseCache::new(&CacheConfig {
        max_entries: 1,
        ..Default::default()
    });
    assert!(cache.get::<u64>("/a").is_none());
    cache.insert("/a", 1_u64, Duration::from_secs(60));
    assert_eq!(cache.get::<u64>("/a"), Some(1));
    cache.insert("/b", 2_u64, Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cache.purge_expired(), 1);

    // CMS request counters through a failing client
    let client = CmsClient::new(
        CmsClientConfig {
            base_url: Url::parse("http://127.0.0.1:1").expect("valid url"),
            read_api_key: String::new(),
            write_api_key: String::new(),
            request_timeout: Duration::from_secs(1),
            probe_path: "/_health".to_string(),
            probe_timeout: Duration::from_secs(1),
        },
        Arc::new(ResponseCache::new(&CacheConfig::default())),
    )
    .expect("client should build");
    assert!(
        client
            .get::<serde_json::Value>(&Endpoint::new("/api/products"), None)
            .await
            .is_none()
    );

    // Health gauge, probe failures and gate rejections
    let probe: Arc<dyn LivenessProbe> = Arc::new(DownProbe);
    let health: Arc<dyn HealthCheck> =
        Arc::new(CmsHealthMonitor::new(probe, Duration::from_secs(5)));
    let gate =
        MaintenanceGate::with_default_exclusions(Arc::new(MaintenanceSwitch::new(false)), health);
    let app = Router::new()
        .route("/", get(|| async { "home" }))
        .layer(middleware::from_fn_with_state(gate, maintenance_gate));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "vitrine_cache_hit_total",
        "vitrine_cache_miss_total",
        "vitrine_cache_evict_total",
        "vitrine_cache_expired_total",
        "vitrine_cms_request_total",
        "vitrine_cms_request_failed_total",
        "vitrine_cms_probe_failed_total",
        "vitrine_cms_available",
        "vitrine_maintenance_rejected_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
