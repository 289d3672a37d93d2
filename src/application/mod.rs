//! Application services consumed by the HTTP handlers.

pub mod catalog;
pub mod error;
