//! Catalog queries backing the home and product pages.
//!
//! Each CMS call degrades independently: a failed call contributes an empty
//! value to the view model instead of failing the whole page.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use vitrine_cms_types::{CategoryType, Product};

use crate::infra::cms::{CmsClient, Endpoint};

pub const PRODUCTS_PATH: &str = "/api/products";
pub const CATEGORY_TYPES_PATH: &str = "/api/category-types";

const COUNTS_CACHE_TTL: Duration = Duration::from_secs(300);
const LISTING_CACHE_TTL: Duration = Duration::from_secs(60);
const LISTING_PAGE_SIZE: u32 = 24;

/// Counts shown on the home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeViewModel {
    pub published_products_count: u64,
    pub category_types_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductListViewModel {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub products: Vec<Product>,
    /// False when the CMS could not be read and the list is a placeholder.
    pub available: bool,
}

#[derive(Clone)]
pub struct CatalogService {
    cms: Arc<CmsClient>,
}

impl CatalogService {
    pub fn new(cms: Arc<CmsClient>) -> Self {
        Self { cms }
    }

    pub async fn overview(&self) -> HomeViewModel {
        let products = Endpoint::new(PRODUCTS_PATH)
            .query("filters[publishedAt][$notNull]", "true")
            .query("pagination[pageSize]", "1");
        let category_types = Endpoint::new(CATEGORY_TYPES_PATH).query("pagination[pageSize]", "1");

        let (products, category_types) = tokio::join!(
            self.cms
                .get_envelope::<Vec<Product>>(&products, Some(COUNTS_CACHE_TTL)),
            self.cms
                .get_envelope::<Vec<CategoryType>>(&category_types, Some(COUNTS_CACHE_TTL)),
        );

        HomeViewModel {
            published_products_count: products.and_then(|envelope| envelope.total()).unwrap_or(0),
            category_types_count: category_types
                .and_then(|envelope| envelope.total())
                .unwrap_or(0),
        }
    }

    pub async fn products(&self, page: u32) -> ProductListViewModel {
        let page = page.max(1);
        let endpoint = Endpoint::new(PRODUCTS_PATH)
            .query("filters[publishedAt][$notNull]", "true")
            .query("pagination[page]", page.to_string())
            .query("pagination[pageSize]", LISTING_PAGE_SIZE.to_string())
            .query("sort", "name:asc");

        match self
            .cms
            .get_envelope::<Vec<Product>>(&endpoint, Some(LISTING_CACHE_TTL))
            .await
        {
            Some(envelope) => ProductListViewModel {
                page,
                page_size: LISTING_PAGE_SIZE,
                total: envelope.total().unwrap_or(envelope.data.len() as u64),
                products: envelope.data,
                available: true,
            },
            None => ProductListViewModel {
                page,
                page_size: LISTING_PAGE_SIZE,
                total: 0,
                products: Vec::new(),
                available: false,
            },
        }
    }
}
