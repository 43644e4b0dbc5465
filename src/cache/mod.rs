// ABOUTME: Nutrition-record cache abstraction with TTL and bounded size
// ABOUTME: Defines the cache-key grammar, the store trait, and its config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// In-memory cache implementation
pub mod memory;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::limits;
use crate::errors::AppResult;
use crate::models::{DiabetesType, FoodItem};

/// Typed cache key; `Display` renders the persisted grammar bit-exactly:
/// `name:<q>`, `barcode:<code>`, `ai:<q>:<type>`, `ai_estimate:<q>:<type>`
/// where `<q>`/`<code>` are normalized and `<type>` is lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Record resolved by name lookup
    Name(String),
    /// Record resolved by barcode lookup
    Barcode(String),
    /// Record produced by the generative model
    Ai(String, DiabetesType),
    /// Record produced by the static estimator
    AiEstimate(String, DiabetesType),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(q) => write!(f, "name:{q}"),
            Self::Barcode(c) => write!(f, "barcode:{c}"),
            Self::Ai(q, t) => write!(f, "ai:{q}:{}", t.key_fragment()),
            Self::AiEstimate(q, t) => write!(f, "ai_estimate:{q}:{}", t.key_fragment()),
        }
    }
}

/// A cached nutrition record with its write timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key the record is stored under
    pub key: String,
    /// The cached record
    pub item: FoodItem,
    /// Last write time; staleness is measured from here
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry is still within its time-to-live.
    /// An entry whose age equals the TTL is already stale.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.updated_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => false,
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age beyond which an entry is treated as a miss
    pub ttl: Duration,
    /// Maximum entry count before oldest-first eviction
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(limits::CACHE_TTL_SECS),
            max_entries: limits::MAX_CACHE_SIZE,
        }
    }
}

/// Keyed store of resolved nutrition records.
///
/// Keys are exclusive: `put` replaces any existing record under the same
/// key. The store is size-bounded; `put` evicts oldest-`updated_at`
/// entries when the bound would be exceeded. Staleness is the caller's
/// concern (`CacheEntry::is_fresh`), matching the lookup-time TTL check
/// the orchestrator performs.
#[async_trait::async_trait]
pub trait NutritionCache: Send + Sync {
    /// Fetch the entry stored under `key`, stale or not
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>>;

    /// Store `item` under `key`, replacing any previous record and
    /// evicting oldest entries if the store is at its bound
    async fn put(&self, key: &CacheKey, item: &FoodItem) -> AppResult<()>;

    /// Number of entries currently stored
    async fn count(&self) -> AppResult<usize>;

    /// Remove the `n` oldest entries by `updated_at`
    async fn delete_oldest(&self, n: usize) -> AppResult<()>;

    /// Remove every entry
    async fn clear_all(&self) -> AppResult<()>;
}
