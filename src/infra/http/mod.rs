mod admin;
pub mod maintenance;
mod middleware;
mod public;

pub use admin::{AdminState, CachePurged, MaintenanceStatus, build_admin_router};
pub use maintenance::{GateDecision, MaintenanceGate, MaintenanceReason, MaintenanceSwitch};
pub use middleware::REQUEST_ID_HEADER;
pub use public::{HttpState, build_router};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

use crate::infra::cms::HealthState;

/// JSON rendering of [`HealthState`] for the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStateView {
    pub is_available: bool,
    pub last_checked_at: Option<String>,
    pub consecutive_failures: u32,
}

fn health_view(state: &HealthState) -> HealthStateView {
    HealthStateView {
        is_available: state.is_available,
        last_checked_at: state
            .last_checked_at
            .and_then(|at| at.format(&Rfc3339).ok()),
        consecutive_failures: state.consecutive_failures,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn health_view_formats_timestamp() {
        let view = health_view(&HealthState {
            is_available: false,
            last_checked_at: Some(datetime!(2026-10-15 08:30:00 UTC)),
            consecutive_failures: 3,
        });

        assert_eq!(
            view.last_checked_at.as_deref(),
            Some("2026-10-15T08:30:00Z")
        );
        assert!(!view.is_available);
        assert_eq!(view.consecutive_failures, 3);
    }

    #[test]
    fn health_view_of_unchecked_state() {
        let view = health_view(&HealthState::default());
        assert!(view.is_available);
        assert!(view.last_checked_at.is_none());
    }
}
