// ABOUTME: In-memory nutrition cache with replace-on-key semantics
// ABOUTME: Evicts oldest entries by updated_at once the size bound is hit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::{CacheConfig, CacheEntry, CacheKey, NutritionCache};
use crate::errors::AppResult;
use crate::models::FoodItem;

/// In-memory nutrition cache.
///
/// State lives behind one `tokio::sync::RwLock`; each mutation holds the
/// write guard for its whole read-modify-write, so eviction and insert
/// are atomic relative to concurrent puts on the same store.
#[derive(Clone)]
pub struct InMemoryNutritionCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    config: CacheConfig,
}

impl InMemoryNutritionCache {
    /// Create an empty cache with the given configuration
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Oldest-first keys, used for eviction
    fn oldest_keys(store: &HashMap<String, CacheEntry>, n: usize) -> Vec<String> {
        let mut entries: Vec<(&String, &CacheEntry)> = store.iter().collect();
        entries.sort_by_key(|(_, e)| e.updated_at);
        entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
    }
}

impl Default for InMemoryNutritionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[async_trait::async_trait]
impl NutritionCache for InMemoryNutritionCache {
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let store = self.store.read().await;
        Ok(store.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, item: &FoodItem) -> AppResult<()> {
        let key = key.to_string();
        let mut store = self.store.write().await;

        // Replacing an existing key never grows the store, so eviction
        // only applies to brand-new keys.
        if !store.contains_key(&key) && store.len() >= self.config.max_entries {
            let excess = store.len() - self.config.max_entries + 1;
            for old in Self::oldest_keys(&store, excess) {
                store.remove(&old);
            }
        }

        let entry = CacheEntry {
            key: key.clone(),
            item: item.clone(),
            updated_at: Utc::now(),
        };
        store.insert(key.clone(), entry);
        drop(store);
        tracing::debug!(key = %key, "cached nutrition record");
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.store.read().await.len())
    }

    async fn delete_oldest(&self, n: usize) -> AppResult<()> {
        let mut store = self.store.write().await;
        for key in Self::oldest_keys(&store, n) {
            store.remove(&key);
        }
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        self.store.write().await.clear();
        Ok(())
    }
}
