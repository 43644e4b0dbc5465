// ABOUTME: Resolution orchestrator - the ordered lookup chain behind every query
// ABOUTME: History fast path, cache, tier scan, AI fallback; one write set per success
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheKey, NutritionCache};
use crate::constants::limits;
use crate::errors::{AppError, AppResult};
use crate::history::{LookupRecord, QueryHistory};
use crate::intelligence::DecisionEngine;
use crate::llm::AiAnalyzer;
use crate::models::{normalize_query, DiabetesType, FoodItem, FoodResolution, HistoryEntry};
use crate::providers::{BarcodeSource, ResolveTier};

/// Orchestrator for the resolution-and-decision pipeline.
///
/// Owns the sequencing of all store reads and writes. Each call runs one
/// sequential chain: query history, keyed cache, then the ordered tiers,
/// then (name path only) the AI fallback. Tier failures are absorbed as
/// fall-through; stores are only written after a tier fully succeeds.
pub struct FoodResolutionService {
    cache: Arc<dyn NutritionCache>,
    history: Arc<dyn QueryHistory>,
    tiers: Vec<Box<dyn ResolveTier>>,
    barcode_source: Option<Arc<dyn BarcodeSource>>,
    ai: AiAnalyzer,
    cache_ttl: Duration,
}

impl FoodResolutionService {
    /// Compose the orchestrator from its collaborators.
    /// `tiers` are tried in order; first hit wins.
    #[must_use]
    pub fn new(
        cache: Arc<dyn NutritionCache>,
        history: Arc<dyn QueryHistory>,
        tiers: Vec<Box<dyn ResolveTier>>,
        barcode_source: Option<Arc<dyn BarcodeSource>>,
        ai: AiAnalyzer,
    ) -> Self {
        Self {
            cache,
            history,
            tiers,
            barcode_source,
            ai,
            cache_ttl: Duration::from_secs(limits::CACHE_TTL_SECS),
        }
    }

    /// Override the cache time-to-live (mainly for tests)
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Resolve a free-text food name into a record and verdict.
    ///
    /// Cannot fail once input validation passes: the AI fallback always
    /// terminates with at least a static estimate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty query.
    pub async fn resolve_by_name(
        &self,
        query: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<FoodResolution> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(AppError::invalid_input("Please enter a food name"));
        }
        debug!(query = %normalized, %diabetes_type, "resolving food by name");

        if let Some(resolution) = self.try_history_fast_path(&normalized, diabetes_type).await? {
            return Ok(resolution);
        }

        let direct_key = CacheKey::Name(normalized.clone()).to_string();
        if let Some(entry) = self.fresh_cache_entry(&direct_key).await? {
            debug!(key = %direct_key, "direct cache hit");
            return self
                .finalize_cached(&normalized, entry, &direct_key, diabetes_type)
                .await;
        }

        for tier in &self.tiers {
            match tier.resolve(&normalized).await {
                Ok(Some(hit)) => {
                    info!(tier = tier.name(), food = %hit.item.name, "tier resolved query");
                    return self
                        .finalize_tier_hit(&normalized, hit.item, &hit.cache_key, diabetes_type)
                        .await;
                }
                Ok(None) => {
                    debug!(tier = tier.name(), "tier had no answer");
                }
                // Absorbed: a failing tier never surfaces, the chain
                // just moves on. Transient failures (network, rate
                // limit, bad body) log at warn, anything else at error.
                Err(e) if e.is_transient() => {
                    warn!(tier = tier.name(), error = %e, "tier failed, falling through");
                }
                Err(e) => {
                    error!(tier = tier.name(), error = %e, "tier failed, falling through");
                }
            }
        }

        self.resolve_with_ai(query, &normalized, diabetes_type).await
    }

    /// Resolve a barcode into a record and verdict.
    ///
    /// Structurally the name path minus the offline tier and the AI
    /// fallback; fails closed when no tier knows the code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty barcode and `ResourceNotFound`
    /// when every tier is exhausted.
    pub async fn resolve_by_barcode(
        &self,
        barcode: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<FoodResolution> {
        let normalized = normalize_query(barcode);
        if normalized.is_empty() {
            return Err(AppError::invalid_input("Please enter a barcode"));
        }
        debug!(barcode = %normalized, %diabetes_type, "resolving food by barcode");

        if let Some(resolution) = self.try_history_fast_path(&normalized, diabetes_type).await? {
            return Ok(resolution);
        }

        let direct_key = CacheKey::Barcode(normalized.clone()).to_string();
        if let Some(entry) = self.fresh_cache_entry(&direct_key).await? {
            debug!(key = %direct_key, "barcode cache hit");
            return self
                .finalize_cached(&normalized, entry, &direct_key, diabetes_type)
                .await;
        }

        if let Some(source) = &self.barcode_source {
            match source.lookup_barcode(&normalized).await {
                Ok(Some(item)) => {
                    info!(food = %item.name, "barcode resolved remotely");
                    let key = CacheKey::Barcode(normalized.clone());
                    return self
                        .finalize_tier_hit(&normalized, item, &key, diabetes_type)
                        .await;
                }
                Ok(None) => debug!("remote source does not know this barcode"),
                Err(e) if e.is_transient() => warn!(error = %e, "barcode source failed"),
                Err(e) => error!(error = %e, "barcode source failed"),
            }
        }

        Err(AppError::not_found(format!("barcode '{normalized}'")))
    }

    /// History fast path: a prior lookup whose `matched_key` still
    /// points at a fresh cache entry short-circuits the chain without
    /// touching any remote source. The history row is refreshed, its
    /// favorite flag untouched.
    async fn try_history_fast_path(
        &self,
        normalized: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<Option<FoodResolution>> {
        let Some(prior) = self
            .history
            .find_by_query_and_type(normalized, diabetes_type)
            .await?
        else {
            return Ok(None);
        };
        let Some(key) = prior.matched_key else {
            return Ok(None);
        };
        let Some(entry) = self.fresh_cache_entry(&key).await? else {
            return Ok(None);
        };

        debug!(key = %key, food = %entry.item.name, "history fast path hit");
        Ok(Some(
            self.finalize_cached(normalized, entry, &key, diabetes_type)
                .await?,
        ))
    }

    /// AI fallback: cached model verdicts first, then the analyzer
    /// (which itself degrades to the static estimate and never fails).
    async fn resolve_with_ai(
        &self,
        query: &str,
        normalized: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<FoodResolution> {
        let ai_key = CacheKey::Ai(normalized.to_owned(), diabetes_type).to_string();
        if let Some(entry) = self.fresh_cache_entry(&ai_key).await? {
            if entry.item.source.is_ai() {
                debug!(key = %ai_key, "cached AI analysis hit");
                return self
                    .finalize_cached(normalized, entry, &ai_key, diabetes_type)
                    .await;
            }
        }

        let analysis = self.ai.analyze(query.trim(), diabetes_type).await;
        info!(source = %analysis.item.source, food = %analysis.item.name, "AI fallback resolved query");

        self.cache.put(&analysis.cache_key, &analysis.item).await?;
        self.history
            .record_lookup(LookupRecord {
                normalized_query: normalized,
                display_name: &analysis.item.name,
                matched_key: Some(&analysis.cache_key.to_string()),
                decision: &analysis.decision,
            })
            .await?;

        Ok(FoodResolution {
            item: analysis.item,
            decision: analysis.decision,
        })
    }

    /// Fetch a cache entry and discard it when stale
    async fn fresh_cache_entry(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let Some(entry) = self.cache.get(key).await? else {
            return Ok(None);
        };
        if entry.is_fresh(self.cache_ttl, Utc::now()) {
            Ok(Some(entry))
        } else {
            debug!(key = %key, "cache entry is stale, treating as miss");
            Ok(None)
        }
    }

    /// Finalize a cache or history hit: decide, refresh history, return.
    /// No cache write happens; the entry is already in place.
    async fn finalize_cached(
        &self,
        normalized: &str,
        entry: CacheEntry,
        matched_key: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<FoodResolution> {
        let decision = DecisionEngine::decide(&entry.item, diabetes_type);
        self.history
            .record_lookup(LookupRecord {
                normalized_query: normalized,
                display_name: &entry.item.name,
                matched_key: Some(matched_key),
                decision: &decision,
            })
            .await?;
        Ok(FoodResolution {
            item: entry.item,
            decision,
        })
    }

    /// Finalize a tier hit: decide, write the cache entry under the
    /// tier's key, upsert history. Exactly one cache put and one history
    /// insert-or-update per successful resolution.
    async fn finalize_tier_hit(
        &self,
        normalized: &str,
        item: FoodItem,
        cache_key: &CacheKey,
        diabetes_type: DiabetesType,
    ) -> AppResult<FoodResolution> {
        let decision = DecisionEngine::decide(&item, diabetes_type);
        self.cache.put(cache_key, &item).await?;
        self.history
            .record_lookup(LookupRecord {
                normalized_query: normalized,
                display_name: &item.name,
                matched_key: Some(&cache_key.to_string()),
                decision: &decision,
            })
            .await?;
        Ok(FoodResolution { item, decision })
    }

    /// Every history row, favorites first, then most recent first
    pub async fn history(&self) -> AppResult<Vec<HistoryEntry>> {
        self.history.list_all().await
    }

    /// Favorite history rows, most recent first
    pub async fn favorites(&self) -> AppResult<Vec<HistoryEntry>> {
        self.history.list_favorites().await
    }

    /// Fetch one history row by query and type
    pub async fn history_item(
        &self,
        query: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<Option<HistoryEntry>> {
        self.history
            .find_by_query_and_type(&normalize_query(query), diabetes_type)
            .await
    }

    /// Toggle the favorite flag on a history row; independent of
    /// resolution and never touched by it
    pub async fn set_favorite(&self, id: i64, is_favorite: bool) -> AppResult<()> {
        self.history.set_favorite(id, is_favorite).await
    }

    /// Remove every history row
    pub async fn clear_history(&self) -> AppResult<()> {
        self.history.clear_all().await
    }
}
