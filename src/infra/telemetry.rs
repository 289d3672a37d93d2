use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vitrine_cache_hit_total",
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            "vitrine_cache_miss_total",
            Unit::Count,
            "Total number of response-cache misses, including expired entries."
        );
        describe_counter!(
            "vitrine_cache_evict_total",
            Unit::Count,
            "Total number of response-cache evictions due to capacity."
        );
        describe_counter!(
            "vitrine_cache_expired_total",
            Unit::Count,
            "Total number of expired entries removed by sweeps."
        );
        describe_counter!(
            "vitrine_cms_request_total",
            Unit::Count,
            "Total number of HTTP requests sent to the CMS."
        );
        describe_counter!(
            "vitrine_cms_request_failed_total",
            Unit::Count,
            "Total number of failed CMS requests, labelled by failure kind."
        );
        describe_counter!(
            "vitrine_cms_probe_failed_total",
            Unit::Count,
            "Total number of failed CMS liveness probes."
        );
        describe_gauge!(
            "vitrine_cms_available",
            Unit::Count,
            "1 when the last CMS probe succeeded, 0 otherwise."
        );
        describe_counter!(
            "vitrine_maintenance_rejected_total",
            Unit::Count,
            "Total number of requests short-circuited by the maintenance gate."
        );
    });
}
