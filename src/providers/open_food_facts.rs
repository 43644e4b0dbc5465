// ABOUTME: Open Food Facts client - primary remote tier for name and barcode lookups
// ABOUTME: Maps the v2 product JSON into FoodItem, first search hit only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ResolveTier, TierHit};
use crate::cache::CacheKey;
use crate::constants::remote::{OFF_FIELDS, SEARCH_PAGE_SIZE};
use crate::errors::{AppError, AppResult};
use crate::models::{FoodItem, FoodSource};

/// Product payload returned by the Open Food Facts v2 API
#[derive(Debug, Clone, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    countries_tags_en: Option<Vec<String>>,
    #[serde(default)]
    carbohydrates_100g: Option<f64>,
    #[serde(default)]
    sugars_100g: Option<f64>,
    #[serde(default)]
    fiber_100g: Option<f64>,
    #[serde(default, rename = "energy-kcal_100g")]
    energy_kcal_100g: Option<f64>,
}

/// Response envelope of `GET /api/v2/search`
#[derive(Debug, Deserialize)]
struct OffSearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

/// Response envelope of `GET /api/v2/product/{code}.json`
#[derive(Debug, Deserialize)]
struct OffProductResponse {
    #[serde(default)]
    status: i32,
    product: Option<OffProduct>,
}

impl OffProduct {
    /// Convert to a `FoodItem`; `None` when the product has no usable name
    fn into_food_item(self) -> Option<FoodItem> {
        let name = self.product_name.filter(|n| !n.trim().is_empty())?;
        Some(FoodItem {
            name,
            brand: self.brands.filter(|b| !b.trim().is_empty()),
            carbs_per_100g: self.carbohydrates_100g,
            sugars_per_100g: self.sugars_100g,
            fiber_per_100g: self.fiber_100g,
            energy_kcal_per_100g: self.energy_kcal_100g,
            country_tags: self.countries_tags_en.unwrap_or_default(),
            source: FoodSource::Off,
            resolved_at: Utc::now(),
        })
    }
}

/// Open Food Facts API client
#[derive(Clone)]
pub struct OffClient {
    client: Client,
    base_url: String,
}

impl OffClient {
    /// Create a client against the given base URL (no trailing slash)
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Search products by free-text terms; returns the first product
    /// carrying a non-blank name, or `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// unparseable body. Callers fall through to the next tier.
    pub async fn search_products(&self, query: &str) -> AppResult<Option<FoodItem>> {
        let url = format!("{}/api/v2/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("page_size", &SEARCH_PAGE_SIZE.to_string()),
                ("fields", OFF_FIELDS),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "Open Food Facts",
                format!("search returned status {status}"),
            ));
        }

        let body: OffSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response("Open Food Facts", e.to_string()))?;

        debug!(query, hits = body.products.len(), "Open Food Facts search");
        Ok(body
            .products
            .into_iter()
            .next()
            .and_then(OffProduct::into_food_item))
    }

    /// Fetch a product by barcode; `None` when the code is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// unparseable body.
    pub async fn product_by_barcode(&self, barcode: &str) -> AppResult<Option<FoodItem>> {
        let url = format!("{}/api/v2/product/{barcode}.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", OFF_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::external_service(
                "Open Food Facts",
                format!("product lookup returned status {status}"),
            ));
        }

        let body: OffProductResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response("Open Food Facts", e.to_string()))?;

        if body.status != 1 {
            return Ok(None);
        }
        Ok(body.product.and_then(OffProduct::into_food_item))
    }
}

#[async_trait::async_trait]
impl super::BarcodeSource for OffClient {
    async fn lookup_barcode(&self, normalized_code: &str) -> AppResult<Option<FoodItem>> {
        self.product_by_barcode(normalized_code).await
    }
}

#[async_trait::async_trait]
impl ResolveTier for OffClient {
    fn name(&self) -> &'static str {
        "OFF"
    }

    async fn resolve(&self, normalized_query: &str) -> AppResult<Option<TierHit>> {
        let item = self.search_products(normalized_query).await?;
        // Search hits are cached under the original query key, not the
        // product's own name.
        Ok(item.map(|item| TierHit {
            item,
            cache_key: CacheKey::Name(normalized_query.to_owned()),
        }))
    }
}
