//! Vitrine: a server-rendered storefront backed by a headless CMS.
//!
//! The interesting part lives in three places: [`cache`] (the response cache
//! and its key builder), [`infra::cms`] (the typed client and health monitor)
//! and [`infra::http::maintenance`] (the gate in front of every request).

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod util;
