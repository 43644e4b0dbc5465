// ABOUTME: In-memory nutrition cache tests - key grammar, TTL, eviction
// ABOUTME: Replace-on-key semantics and size-bound behavior
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use carbsense::cache::memory::InMemoryNutritionCache;
use carbsense::cache::{CacheConfig, CacheEntry, CacheKey, NutritionCache};
use carbsense::models::{DiabetesType, FoodItem, FoodSource};

fn small_cache(max_entries: usize) -> InMemoryNutritionCache {
    InMemoryNutritionCache::new(CacheConfig {
        ttl: Duration::from_secs(30 * 24 * 60 * 60),
        max_entries,
    })
}

#[test]
fn cache_key_grammar_is_exact() {
    assert_eq!(CacheKey::Name("dal makhani".into()).to_string(), "name:dal makhani");
    assert_eq!(CacheKey::Barcode("8901030865278".into()).to_string(), "barcode:8901030865278");
    assert_eq!(
        CacheKey::Ai("poha".into(), DiabetesType::Type2).to_string(),
        "ai:poha:type_2"
    );
    assert_eq!(
        CacheKey::AiEstimate("poha".into(), DiabetesType::Type1).to_string(),
        "ai_estimate:poha:type_1"
    );
}

#[tokio::test]
async fn put_then_get_round_trips() -> Result<()> {
    let cache = small_cache(10);
    let item = FoodItem::named("Masoor Dal", FoodSource::Off);
    let key = CacheKey::Name("masoor dal".into());

    cache.put(&key, &item).await?;
    let entry = cache.get("name:masoor dal").await?.expect("entry present");
    assert_eq!(entry.item.name, "Masoor Dal");
    assert_eq!(entry.key, "name:masoor dal");
    Ok(())
}

#[tokio::test]
async fn put_replaces_existing_key() -> Result<()> {
    let cache = small_cache(10);
    let key = CacheKey::Name("idli".into());

    cache.put(&key, &FoodItem::named("Idli", FoodSource::Off)).await?;
    cache.put(&key, &FoodItem::named("Idli Steamed", FoodSource::Usda)).await?;

    assert_eq!(cache.count().await?, 1);
    let entry = cache.get("name:idli").await?.expect("entry present");
    assert_eq!(entry.item.name, "Idli Steamed");
    assert_eq!(entry.item.source, FoodSource::Usda);
    Ok(())
}

#[tokio::test]
async fn eviction_drops_oldest_entries_only_for_new_keys() -> Result<()> {
    let cache = small_cache(2);

    cache.put(&CacheKey::Name("a".into()), &FoodItem::named("A", FoodSource::Off)).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.put(&CacheKey::Name("b".into()), &FoodItem::named("B", FoodSource::Off)).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Replacing an existing key at the bound evicts nothing
    cache.put(&CacheKey::Name("a".into()), &FoodItem::named("A2", FoodSource::Off)).await?;
    assert_eq!(cache.count().await?, 2);
    assert!(cache.get("name:b").await?.is_some());

    // A brand-new key evicts the oldest entry, now "b"
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.put(&CacheKey::Name("c".into()), &FoodItem::named("C", FoodSource::Off)).await?;
    assert_eq!(cache.count().await?, 2);
    assert!(cache.get("name:b").await?.is_none());
    assert!(cache.get("name:a").await?.is_some());
    assert!(cache.get("name:c").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn get_returns_stale_entries_for_caller_side_ttl_checks() -> Result<()> {
    let cache = small_cache(10);
    cache.put(&CacheKey::Name("ghee".into()), &FoodItem::named("Ghee", FoodSource::Off)).await?;

    let entry = cache.get("name:ghee").await?.expect("entry present");
    let ttl = Duration::from_secs(60);
    let now = Utc::now();

    assert!(entry.is_fresh(ttl, now));
    assert!(!entry.is_fresh(ttl, now + chrono::Duration::seconds(61)));
    Ok(())
}

#[test]
fn entry_at_exactly_ttl_age_is_stale() {
    let ttl = Duration::from_secs(120);
    let now = Utc::now();
    let entry = CacheEntry {
        key: "name:ghee".into(),
        item: FoodItem::named("Ghee", FoodSource::Off),
        updated_at: now - chrono::Duration::seconds(120),
    };
    assert!(!entry.is_fresh(ttl, now));
}

#[tokio::test]
async fn delete_oldest_and_clear_all() -> Result<()> {
    let cache = small_cache(10);
    for name in ["a", "b", "c"] {
        cache
            .put(&CacheKey::Name(name.into()), &FoodItem::named(name, FoodSource::Off))
            .await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cache.delete_oldest(2).await?;
    assert_eq!(cache.count().await?, 1);
    assert!(cache.get("name:c").await?.is_some());

    cache.clear_all().await?;
    assert_eq!(cache.count().await?, 0);
    Ok(())
}
