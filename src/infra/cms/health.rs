//! CMS liveness tracking.
//!
//! The monitor caches the last probe result for a short TTL. Callers that find
//! the result stale queue on one async mutex and re-check after acquiring it,
//! so a burst of requests against a struggling CMS produces a single probe.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use metrics::{counter, gauge};
use time::OffsetDateTime;
use tokio::{sync::Mutex, time::Instant};
use tracing::{info, warn};

use crate::util::lock::{rw_read, rw_write};

use super::{client::CmsClient, error::CmsError};

const SOURCE: &str = "vitrine::cms::health";

/// Something that can tell whether the CMS is reachable right now.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self) -> Result<(), CmsError>;
}

#[async_trait]
impl LivenessProbe for CmsClient {
    async fn probe(&self) -> Result<(), CmsError> {
        CmsClient::probe(self).await
    }
}

/// Cheap availability check consulted by the maintenance gate.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn is_available(&self) -> bool;
}

/// Snapshot of the process-wide CMS health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub is_available: bool,
    pub last_checked_at: Option<OffsetDateTime>,
    pub consecutive_failures: u32,
}

impl Default for HealthState {
    /// Optimistic until the first probe says otherwise.
    fn default() -> Self {
        Self {
            is_available: true,
            last_checked_at: None,
            consecutive_failures: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Tracked {
    state: HealthState,
    checked_at: Option<Instant>,
}

pub struct CmsHealthMonitor {
    probe: Arc<dyn LivenessProbe>,
    ttl: Duration,
    tracked: RwLock<Tracked>,
    probing: Mutex<()>,
}

impl CmsHealthMonitor {
    pub fn new(probe: Arc<dyn LivenessProbe>, ttl: Duration) -> Self {
        gauge!("vitrine_cms_available").set(1.0);
        Self {
            probe,
            ttl,
            tracked: RwLock::new(Tracked::default()),
            probing: Mutex::new(()),
        }
    }

    pub fn state(&self) -> HealthState {
        rw_read(&self.tracked, SOURCE, "state").state.clone()
    }

    /// Probe now, ignoring the TTL, and return the updated state.
    pub async fn refresh(&self) -> HealthState {
        let _probing = self.probing.lock().await;
        self.run_probe().await
    }

    fn fresh_availability(&self) -> Option<bool> {
        let tracked = rw_read(&self.tracked, SOURCE, "fresh_availability");
        tracked
            .checked_at
            .filter(|at| at.elapsed() < self.ttl)
            .map(|_| tracked.state.is_available)
    }

    async fn run_probe(&self) -> HealthState {
        let outcome = self.probe.probe().await;
        let now = Instant::now();
        let mut tracked = rw_write(&self.tracked, SOURCE, "run_probe");
        let was_available = tracked.state.is_available;

        match outcome {
            Ok(()) => {
                tracked.state.is_available = true;
                tracked.state.consecutive_failures = 0;
                gauge!("vitrine_cms_available").set(1.0);
                if !was_available {
                    info!(target = SOURCE, "CMS is reachable again");
                }
            }
            Err(err) => {
                tracked.state.is_available = false;
                tracked.state.consecutive_failures =
                    tracked.state.consecutive_failures.saturating_add(1);
                counter!("vitrine_cms_probe_failed_total").increment(1);
                gauge!("vitrine_cms_available").set(0.0);
                warn!(
                    target = SOURCE,
                    kind = err.kind(),
                    status = err.status(),
                    consecutive_failures = tracked.state.consecutive_failures,
                    error = %err,
                    "CMS liveness probe failed",
                );
            }
        }

        tracked.checked_at = Some(now);
        tracked.state.last_checked_at = Some(OffsetDateTime::now_utc());
        tracked.state.clone()
    }
}

#[async_trait]
impl HealthCheck for CmsHealthMonitor {
    async fn is_available(&self) -> bool {
        if let Some(available) = self.fresh_availability() {
            return available;
        }

        let _probing = self.probing.lock().await;
        // Another caller may have finished a probe while we waited.
        if let Some(available) = self.fresh_availability() {
            return available;
        }

        self.run_probe().await.is_available
    }
}
