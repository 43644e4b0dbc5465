// ABOUTME: Offline regional food dataset - read-only, name-keyed lookup tier
// ABOUTME: Bundled JSON restricted to a fixed South Asian region tag set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::{ResolveTier, TierHit};
use crate::cache::CacheKey;
use crate::constants::offline::REGION_TAGS;
use crate::errors::{AppError, AppResult};
use crate::models::{normalize_query, FoodItem, FoodSource};

/// Dataset bundled with the crate
const BUNDLED_DATASET: &str = include_str!("../../data/south_asian_foods.json");

/// One row of the offline dataset file
#[derive(Debug, Clone, Deserialize)]
struct OfflineFood {
    product_name: String,
    #[serde(default)]
    categories_tags: Vec<String>,
    #[serde(default)]
    countries_tags: Vec<String>,
    #[serde(default)]
    carbohydrates_100g: Option<f64>,
    #[serde(default)]
    sugars_100g: Option<f64>,
    #[serde(default)]
    fiber_100g: Option<f64>,
}

impl OfflineFood {
    fn in_region(&self) -> bool {
        self.countries_tags.iter().any(|tag| {
            let tag = tag.to_lowercase();
            REGION_TAGS.iter().any(|region| tag.contains(region))
        })
    }

    fn to_food_item(&self) -> FoodItem {
        FoodItem {
            name: self.product_name.clone(),
            brand: self
                .categories_tags
                .first()
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty()),
            carbs_per_100g: self.carbohydrates_100g,
            sugars_per_100g: self.sugars_100g,
            fiber_per_100g: self.fiber_100g,
            energy_kcal_per_100g: None,
            country_tags: self.countries_tags.clone(),
            source: FoodSource::LocalDb,
            resolved_at: Utc::now(),
        }
    }
}

/// Read-only, name-keyed lookup over the bundled regional food subset.
/// Returns at most one match per query.
#[derive(Clone)]
pub struct OfflineDataset {
    records: Vec<OfflineFood>,
}

impl OfflineDataset {
    /// Load the dataset bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled JSON does not parse, which would
    /// indicate a packaging defect.
    pub fn bundled() -> AppResult<Self> {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Load a dataset from a JSON file on disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| AppError::config(format!("Cannot read offline dataset: {e}")))?;
        Self::from_json(&raw)
    }

    fn from_json(raw: &str) -> AppResult<Self> {
        let records: Vec<OfflineFood> = serde_json::from_str(raw)
            .map_err(|e| AppError::config(format!("Invalid offline dataset: {e}")))?;
        debug!(records = records.len(), "offline dataset loaded");
        Ok(Self { records })
    }

    /// Case-insensitive substring lookup restricted to the region tag
    /// set; the first matching row wins.
    #[must_use]
    pub fn find_by_name(&self, normalized_query: &str) -> Option<FoodItem> {
        self.records
            .iter()
            .filter(|r| r.in_region())
            .find(|r| r.product_name.to_lowercase().contains(normalized_query))
            .map(OfflineFood::to_food_item)
    }
}

#[async_trait::async_trait]
impl ResolveTier for OfflineDataset {
    fn name(&self) -> &'static str {
        "LOCAL_DB"
    }

    async fn resolve(&self, normalized_query: &str) -> AppResult<Option<TierHit>> {
        // The dataset's canonical name is authoritative for the cache
        // key, not the query that happened to match it.
        Ok(self.find_by_name(normalized_query).map(|item| {
            let cache_key = CacheKey::Name(normalize_query(&item.name));
            TierHit { item, cache_key }
        }))
    }
}
