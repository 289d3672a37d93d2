//! Wire types for the headless CMS.
//!
//! Every CMS response arrives wrapped in the same `{ data, meta }` envelope.
//! Resource payloads are plain DTOs; anything the frontend does not read is
//! ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Standard `{ data, meta }` wrapper around CMS payloads.
///
/// `data` is either a single resource or a list, depending on the endpoint, so
/// callers pick `ResponseEnvelope<Product>` or `ResponseEnvelope<Vec<Product>>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl<T> ResponseEnvelope<T> {
    /// Total item count reported by the CMS, if the response was paginated.
    pub fn total(&self) -> Option<u64> {
        self.meta.pagination.as_ref().map(|pagination| pagination.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// Request body wrapper for POST/PUT; the CMS expects writes nested under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBody<T> {
    pub data: T,
}

impl<T> DataBody<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryType {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}
