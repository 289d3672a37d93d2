//! Vitrine Response Cache
//!
//! Process-wide, type-erased cache for deserialized CMS responses:
//!
//! - **Keys** are derived from the endpoint path plus its query parameters,
//!   normalized so parameter order never matters ([`build_key`]).
//! - **Entries** carry their own expiry, chosen by the call site. Expired
//!   entries are dropped lazily on lookup, by the periodic sweep, or when the
//!   store is full.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! max_entries = 1000
//! sweep_interval_seconds = 60
//! ```

mod config;
mod keys;
mod store;

pub use config::CacheConfig;
pub use keys::build_key;
pub use store::ResponseCache;
