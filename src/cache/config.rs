//! Cache configuration.
//!
//! Controls the response cache via the `[cache]` section of `vitrine.toml`.

use std::time::Duration;

const DEFAULT_MAX_ENTRIES: usize = 1000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Response cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries once every insert has returned; `0` disables
    /// the bound.
    pub max_entries: usize,
    /// How often the background sweep drops expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            sweep_interval: settings.sweep_interval,
        }
    }
}

impl CacheConfig {
    /// Returns true when the store should evict to stay within `max_entries`.
    pub fn is_bounded(&self) -> bool {
        self.max_entries > 0
    }
}
