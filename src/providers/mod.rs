// ABOUTME: Resolution tiers for the ordered lookup chain
// ABOUTME: Uniform ResolveTier trait over offline dataset and remote sources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// Shared HTTP client with connection pooling
pub mod http_client;
/// Offline regional dataset tier
pub mod offline;
/// Open Food Facts tier (primary remote source)
pub mod open_food_facts;
/// USDA FoodData Central tier (secondary remote source)
pub mod usda;

pub use offline::OfflineDataset;
pub use open_food_facts::OffClient;
pub use usda::UsdaClient;

use crate::cache::CacheKey;
use crate::errors::AppResult;
use crate::models::FoodItem;

/// One successful tier result: the record plus the cache key it should
/// be stored under. Tiers differ here: the offline dataset and USDA key
/// by their canonical resolved name, Open Food Facts by the original
/// query.
#[derive(Debug, Clone)]
pub struct TierHit {
    /// The resolved record
    pub item: FoodItem,
    /// Cache key this record belongs under
    pub cache_key: CacheKey,
}

/// Remote source able to look a product up by barcode.
///
/// `Ok(None)` means the code is unknown; the barcode path fails closed
/// on it (there is no AI fallback for barcodes).
#[async_trait::async_trait]
pub trait BarcodeSource: Send + Sync {
    /// Fetch the product behind a normalized barcode
    async fn lookup_barcode(&self, normalized_code: &str) -> AppResult<Option<FoodItem>>;
}

/// One ordered attempt source in the name-resolution chain.
///
/// `Ok(None)` means the tier has no answer; `Err` means the tier failed.
/// The orchestrator treats both as fall-through to the next tier; tier
/// errors are absorbed, never surfaced. Only the first candidate from a
/// tier is ever considered.
#[async_trait::async_trait]
pub trait ResolveTier: Send + Sync {
    /// Tier name for logging and the `sources_used` field
    fn name(&self) -> &'static str;

    /// Attempt to resolve `normalized_query` at this tier
    async fn resolve(&self, normalized_query: &str) -> AppResult<Option<TierHit>>;
}
