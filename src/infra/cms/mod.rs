//! Headless CMS adapter: typed client, liveness probing, health state.

mod client;
mod endpoint;
mod error;
mod health;

pub use client::{CmsClient, CmsClientConfig};
pub use endpoint::Endpoint;
pub use error::CmsError;
pub use health::{CmsHealthMonitor, HealthCheck, HealthState, LivenessProbe};
