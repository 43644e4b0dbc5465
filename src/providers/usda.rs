// ABOUTME: USDA FoodData Central client - secondary remote tier with 429 backoff
// ABOUTME: Search-then-details flow mapping fixed nutrient ids into FoodItem
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ResolveTier, TierHit};
use crate::cache::CacheKey;
use crate::constants::nutrient_ids;
use crate::constants::remote::{
    MAX_RATE_LIMIT_RETRIES, RATE_LIMIT_BACKOFF_BASE_MS, SEARCH_PAGE_SIZE,
};
use crate::errors::{AppError, AppResult};
use crate::models::{normalize_query, FoodItem, FoodSource};

#[derive(Debug, Deserialize)]
struct UsdaSearchResponse {
    #[serde(default)]
    foods: Vec<UsdaSearchHit>,
}

#[derive(Debug, Deserialize)]
struct UsdaSearchHit {
    #[serde(rename = "fdcId")]
    fdc_id: i64,
}

#[derive(Debug, Deserialize)]
struct UsdaFoodDetails {
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "foodNutrients")]
    food_nutrients: Vec<UsdaFoodNutrient>,
}

#[derive(Debug, Deserialize)]
struct UsdaFoodNutrient {
    #[serde(default, rename = "nutrientId")]
    nutrient_id: Option<u32>,
    #[serde(default)]
    value: Option<f64>,
}

/// USDA FoodData Central API client.
///
/// Both endpoints share one bounded retry policy for 429 responses:
/// attempt `n` sleeps `base * n^2` milliseconds, up to
/// `MAX_RATE_LIMIT_RETRIES` attempts, after which the rate limit is
/// reported as exhausted and the caller falls through to the next tier.
#[derive(Clone)]
pub struct UsdaClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl UsdaClient {
    /// Create a client against the given base URL (no trailing slash)
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Issue one request, retrying on 429 with quadratic backoff
    async fn send_with_backoff<F>(&self, build: F, what: &str) -> AppResult<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let response = build().header("X-Api-Key", &self.api_key).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                if attempt >= MAX_RATE_LIMIT_RETRIES {
                    warn!(what, attempt, "USDA rate limit budget exhausted");
                    return Err(AppError::rate_limited("USDA"));
                }
                let backoff_ms = RATE_LIMIT_BACKOFF_BASE_MS * u64::from(attempt * attempt);
                warn!(what, attempt, backoff_ms, "USDA rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                continue;
            }

            if !status.is_success() {
                return Err(AppError::external_service(
                    "USDA",
                    format!("{what} returned status {status}"),
                ));
            }
            return Ok(response);
        }
    }

    /// Search foods by query; returns the first hit's identifier
    async fn search_first_id(&self, query: &str) -> AppResult<Option<i64>> {
        let url = format!("{}/v1/foods/search", self.base_url);
        let response = self
            .send_with_backoff(
                || {
                    self.client.post(&url).query(&[
                        ("query", query),
                        ("pageSize", &SEARCH_PAGE_SIZE.to_string()),
                    ])
                },
                "search",
            )
            .await?;

        let body: UsdaSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response("USDA", e.to_string()))?;
        debug!(query, hits = body.foods.len(), "USDA search");
        Ok(body.foods.first().map(|f| f.fdc_id))
    }

    /// Fetch details for one food and map its nutrient table
    async fn food_details(&self, fdc_id: i64, fallback_name: &str) -> AppResult<FoodItem> {
        let url = format!("{}/v1/food/{fdc_id}", self.base_url);
        let response = self
            .send_with_backoff(|| self.client.get(&url), "details")
            .await?;

        let details: UsdaFoodDetails = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response("USDA", e.to_string()))?;

        let nutrients: HashMap<u32, f64> = details
            .food_nutrients
            .iter()
            .filter_map(|n| Some((n.nutrient_id?, n.value?)))
            .collect();

        let name = details
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_owned());

        Ok(FoodItem {
            name,
            brand: None,
            carbs_per_100g: nutrients.get(&nutrient_ids::CARBOHYDRATE).copied(),
            sugars_per_100g: nutrients.get(&nutrient_ids::SUGARS_TOTAL).copied(),
            fiber_per_100g: nutrients.get(&nutrient_ids::FIBER_TOTAL_DIETARY).copied(),
            energy_kcal_per_100g: None,
            country_tags: Vec::new(),
            source: FoodSource::Usda,
            resolved_at: Utc::now(),
        })
    }
}

#[async_trait::async_trait]
impl ResolveTier for UsdaClient {
    fn name(&self) -> &'static str {
        "USDA"
    }

    async fn resolve(&self, normalized_query: &str) -> AppResult<Option<TierHit>> {
        let Some(fdc_id) = self.search_first_id(normalized_query).await? else {
            return Ok(None);
        };
        let item = self.food_details(fdc_id, normalized_query).await?;
        // The database's own description is authoritative for the key.
        let cache_key = CacheKey::Name(normalize_query(&item.name));
        Ok(Some(TierHit { item, cache_key }))
    }
}
