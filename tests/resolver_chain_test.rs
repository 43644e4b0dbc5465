// ABOUTME: Orchestrator tests with stubbed tiers, barcode source, and model
// ABOUTME: Fast paths, fall-through ordering, AI fallback, fail-closed barcodes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use carbsense::cache::memory::InMemoryNutritionCache;
use carbsense::cache::{CacheKey, NutritionCache};
use carbsense::errors::{AppError, AppResult};
use carbsense::history::memory::InMemoryQueryHistory;
use carbsense::history::QueryHistory;
use carbsense::llm::{AiAnalyzer, GenerativeModel};
use carbsense::models::{DiabetesType, FoodItem, FoodSource, Suitability};
use carbsense::providers::{BarcodeSource, ResolveTier, TierHit};
use carbsense::services::FoodResolutionService;

/// Tier stub: fixed behavior plus a call counter
struct StubTier {
    name: &'static str,
    behavior: TierBehavior,
    calls: Arc<AtomicUsize>,
}

enum TierBehavior {
    Hit(FoodItem),
    Miss,
    Fail,
    FailHard,
}

impl StubTier {
    fn new(name: &'static str, behavior: TierBehavior) -> (Box<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                name,
                behavior,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl ResolveTier for StubTier {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, normalized_query: &str) -> AppResult<Option<TierHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            TierBehavior::Hit(item) => Ok(Some(TierHit {
                item: item.clone(),
                cache_key: CacheKey::Name(normalized_query.to_owned()),
            })),
            TierBehavior::Miss => Ok(None),
            TierBehavior::Fail => Err(AppError::external_service(self.name, "stub failure")),
            TierBehavior::FailHard => Err(AppError::database("stub failure")),
        }
    }
}

/// Barcode source stub with a call counter
struct StubBarcodeSource {
    item: Option<FoodItem>,
    calls: Arc<AtomicUsize>,
}

impl StubBarcodeSource {
    fn new(item: Option<FoodItem>) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                item,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl BarcodeSource for StubBarcodeSource {
    async fn lookup_barcode(&self, _normalized_code: &str) -> AppResult<Option<FoodItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.item.clone())
    }
}

/// Model stub answering with one fixed JSON verdict
struct StubModel {
    response: String,
    calls: Arc<AtomicUsize>,
}

impl StubModel {
    fn new(response: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                response: response.to_owned(),
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

fn stores() -> (Arc<InMemoryNutritionCache>, Arc<InMemoryQueryHistory>) {
    (
        Arc::new(InMemoryNutritionCache::default()),
        Arc::new(InMemoryQueryHistory::default()),
    )
}

fn nutritious(name: &str, source: FoodSource) -> FoodItem {
    FoodItem {
        carbs_per_100g: Some(20.0),
        sugars_per_100g: Some(2.0),
        fiber_per_100g: Some(1.0),
        ..FoodItem::named(name, source)
    }
}

#[tokio::test]
async fn empty_query_is_rejected_without_touching_stores() -> Result<()> {
    let (cache, history) = stores();
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        Vec::new(),
        None,
        AiAnalyzer::without_model(),
    );

    let err = service
        .resolve_by_name("   ", DiabetesType::Type2)
        .await
        .expect_err("blank query must be rejected");
    assert!(err.to_string().contains("food name"));
    assert_eq!(cache.count().await?, 0);
    assert_eq!(history.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn tier_hit_is_cached_recorded_and_fast_pathed_next_time() -> Result<()> {
    let (cache, history) = stores();
    let (tier, calls) = StubTier::new(
        "LOCAL_DB",
        TierBehavior::Hit(nutritious("Masoor Dal", FoodSource::LocalDb)),
    );
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        vec![tier],
        None,
        AiAnalyzer::without_model(),
    );

    let first = service.resolve_by_name("Masoor Dal", DiabetesType::Type2).await?;
    assert_eq!(first.item.source, FoodSource::LocalDb);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let entry = cache.get("name:masoor dal").await?.expect("cached under query key");
    assert_eq!(entry.item.name, "Masoor Dal");

    let row = history
        .find_by_query_and_type("masoor dal", DiabetesType::Type2)
        .await?
        .expect("history row present");
    assert_eq!(row.matched_key.as_deref(), Some("name:masoor dal"));

    // Second lookup short-circuits through history; the tier is not asked
    let second = service.resolve_by_name("masoor dal", DiabetesType::Type2).await?;
    assert_eq!(second.item.name, "Masoor Dal");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn failing_tier_falls_through_to_the_next_one() -> Result<()> {
    let (cache, history) = stores();
    let (broken, broken_calls) = StubTier::new("LOCAL_DB", TierBehavior::Fail);
    let (missing, missing_calls) = StubTier::new("OFF", TierBehavior::Miss);
    let (working, working_calls) = StubTier::new(
        "USDA",
        TierBehavior::Hit(nutritious("Poha", FoodSource::Usda)),
    );
    let service = FoodResolutionService::new(
        cache as Arc<dyn NutritionCache>,
        history as Arc<dyn QueryHistory>,
        vec![broken, missing, working],
        None,
        AiAnalyzer::without_model(),
    );

    let resolution = service.resolve_by_name("poha", DiabetesType::Type2).await?;
    assert_eq!(resolution.item.source, FoodSource::Usda);
    assert_eq!(broken_calls.load(Ordering::SeqCst), 1);
    assert_eq!(missing_calls.load(Ordering::SeqCst), 1);
    assert_eq!(working_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn non_transient_tier_failure_is_still_absorbed() -> Result<()> {
    let (cache, history) = stores();
    let (broken, broken_calls) = StubTier::new("LOCAL_DB", TierBehavior::FailHard);
    let (working, working_calls) = StubTier::new(
        "OFF",
        TierBehavior::Hit(nutritious("Idli", FoodSource::Off)),
    );
    let service = FoodResolutionService::new(
        cache as Arc<dyn NutritionCache>,
        history as Arc<dyn QueryHistory>,
        vec![broken, working],
        None,
        AiAnalyzer::without_model(),
    );

    let resolution = service.resolve_by_name("idli", DiabetesType::Type2).await?;
    assert_eq!(resolution.item.source, FoodSource::Off);
    assert_eq!(broken_calls.load(Ordering::SeqCst), 1);
    assert_eq!(working_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn only_remote_failures_count_as_transient() {
    assert!(AppError::external_service("OFF", "timed out").is_transient());
    assert!(AppError::rate_limited("USDA").is_transient());
    assert!(AppError::malformed_response("OFF", "truncated body").is_transient());
    assert!(!AppError::database("disk full").is_transient());
    assert!(!AppError::invalid_input("blank query").is_transient());
}

#[tokio::test]
async fn exhausted_chain_without_model_yields_static_estimate() -> Result<()> {
    let (cache, history) = stores();
    let (tier, _) = StubTier::new("OFF", TierBehavior::Miss);
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        vec![tier],
        None,
        AiAnalyzer::without_model(),
    );

    let resolution = service.resolve_by_name("Dal", DiabetesType::Type2).await?;
    assert_eq!(resolution.item.source, FoodSource::AiEstimate);
    assert_eq!(resolution.decision.category, Suitability::SmallPortion);
    assert_eq!(
        resolution.decision.reason,
        "Estimated values for Dal - AI analysis not available or API key missing."
    );
    assert_eq!(
        resolution.decision.portion_text,
        "Approximate values (100g portion) - verify with healthcare provider."
    );
    assert_eq!(
        resolution.decision.alternatives,
        vec!["Consult a nutritionist", "Check detailed nutrition info"]
    );
    assert!(cache.get("ai_estimate:dal:type_2").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn model_verdict_is_used_fresh_but_reclassified_on_cache_hits() -> Result<()> {
    let (cache, history) = stores();
    let (model, model_calls) = StubModel::new(
        r#"```json
{"category": "LIMIT", "reason": "Model reason", "safePortion": "50g", "alternatives": ["salad"]}
```"#,
    );
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        Vec::new(),
        None,
        AiAnalyzer::new(model),
    );

    // Fresh model output carries the model's own verdict
    let first = service.resolve_by_name("halwa", DiabetesType::Type2).await?;
    assert_eq!(first.item.source, FoodSource::Ai);
    assert_eq!(first.decision.category, Suitability::Limit);
    assert_eq!(first.decision.reason, "Model reason");
    assert!(cache.get("ai:halwa:type_2").await?.is_some());
    assert_eq!(model_calls.load(Ordering::SeqCst), 1);

    // A repeat lookup reuses the cached record but re-runs the rule
    // engine over it, so the verdict is recomputed, not replayed.
    let second = service.resolve_by_name("halwa", DiabetesType::Type2).await?;
    assert_eq!(second.item.source, FoodSource::Ai);
    assert_ne!(second.decision.reason, "Model reason");
    assert_eq!(model_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_model_output_degrades_to_static_estimate() -> Result<()> {
    let (cache, history) = stores();
    let (model, _) = StubModel::new("this is not json at all");
    let service = FoodResolutionService::new(
        cache as Arc<dyn NutritionCache>,
        history as Arc<dyn QueryHistory>,
        Vec::new(),
        None,
        AiAnalyzer::new(model),
    );

    let resolution = service.resolve_by_name("kheer", DiabetesType::Type1).await?;
    assert_eq!(resolution.item.source, FoodSource::AiEstimate);
    Ok(())
}

#[tokio::test]
async fn unknown_barcode_fails_closed() -> Result<()> {
    let (cache, history) = stores();
    let (source, calls) = StubBarcodeSource::new(None);
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        Vec::new(),
        Some(source),
        AiAnalyzer::without_model(),
    );

    let err = service
        .resolve_by_barcode("00000000", DiabetesType::Type2)
        .await
        .expect_err("unknown barcode must not invent a record");
    assert!(err.to_string().contains("00000000"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.count().await?, 0);
    assert_eq!(history.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn known_barcode_is_cached_under_the_barcode_key() -> Result<()> {
    let (cache, history) = stores();
    let (source, calls) = StubBarcodeSource::new(Some(nutritious("Parle-G", FoodSource::Off)));
    let service = FoodResolutionService::new(
        Arc::clone(&cache) as Arc<dyn NutritionCache>,
        Arc::clone(&history) as Arc<dyn QueryHistory>,
        Vec::new(),
        Some(source),
        AiAnalyzer::without_model(),
    );

    let first = service.resolve_by_barcode("8901719100017", DiabetesType::Type2).await?;
    assert_eq!(first.item.name, "Parle-G");
    assert!(cache.get("barcode:8901719100017").await?.is_some());

    let row = history
        .find_by_query_and_type("8901719100017", DiabetesType::Type2)
        .await?
        .expect("history row present");
    assert_eq!(row.matched_key.as_deref(), Some("barcode:8901719100017"));

    // Repeat scan is served from history plus cache
    let second = service.resolve_by_barcode("8901719100017", DiabetesType::Type2).await?;
    assert_eq!(second.item.name, "Parle-G");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn blank_barcode_is_rejected() {
    let (cache, history) = stores();
    let service = FoodResolutionService::new(
        cache as Arc<dyn NutritionCache>,
        history as Arc<dyn QueryHistory>,
        Vec::new(),
        None,
        AiAnalyzer::without_model(),
    );

    assert!(service
        .resolve_by_barcode("  ", DiabetesType::Type2)
        .await
        .is_err());
}
