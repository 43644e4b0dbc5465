// ABOUTME: Query-history store abstraction keyed by (normalized query, diabetes type)
// ABOUTME: Favorite-preserving upsert, bounded size, favorites-first listing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// In-memory history implementation
pub mod memory;

use crate::constants::limits;
use crate::errors::AppResult;
use crate::models::{Decision, DiabetesType, HistoryEntry};

/// History store configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum row count before oldest-first eviction
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: limits::MAX_HISTORY_SIZE,
        }
    }
}

/// Inputs for recording one successful resolution into history
#[derive(Debug, Clone)]
pub struct LookupRecord<'a> {
    /// Normalized query text (identity, with `diabetes_type`)
    pub normalized_query: &'a str,
    /// Actual resolved name, for display
    pub display_name: &'a str,
    /// Cache key of the backing record, when one was written
    pub matched_key: Option<&'a str>,
    /// The decision produced for this lookup
    pub decision: &'a Decision,
}

/// Durable per-(query, type) record of past lookups.
///
/// Identity is the `(normalized_query, diabetes_type)` pair.
/// `record_lookup` is the transactional insert-or-update: an existing row
/// gets a fresh display name and timestamp only (its favorite flag and
/// stored verdict are untouched); a new row is inserted with the favorite
/// flag off, evicting oldest rows first when the store is at its bound.
/// Implementations must apply each mutation atomically.
#[async_trait::async_trait]
pub trait QueryHistory: Send + Sync {
    /// Fetch the row for a (query, type) pair
    async fn find_by_query_and_type(
        &self,
        normalized_query: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<Option<HistoryEntry>>;

    /// Atomic insert-or-update for one successful resolution
    async fn record_lookup(&self, record: LookupRecord<'_>) -> AppResult<()>;

    /// Set the favorite flag on a row; independent of resolution
    async fn set_favorite(&self, id: i64, is_favorite: bool) -> AppResult<()>;

    /// Every row, favorites first, then most recent first
    async fn list_all(&self) -> AppResult<Vec<HistoryEntry>>;

    /// Favorite rows only, most recent first
    async fn list_favorites(&self) -> AppResult<Vec<HistoryEntry>>;

    /// Number of rows currently stored
    async fn count(&self) -> AppResult<usize>;

    /// Remove the `n` oldest rows by `created_at`
    async fn delete_oldest(&self, n: usize) -> AppResult<()>;

    /// Remove every row
    async fn clear_all(&self) -> AppResult<()>;
}
