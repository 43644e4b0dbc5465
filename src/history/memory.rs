// ABOUTME: In-memory query-history store with favorite-preserving upsert
// ABOUTME: Evicts oldest rows by created_at before inserting at the bound
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::{HistoryConfig, LookupRecord, QueryHistory};
use crate::errors::{AppError, AppResult};
use crate::models::{DiabetesType, HistoryEntry};

/// In-memory history store.
///
/// Rows live in a `Vec` behind one `tokio::sync::RwLock`; each mutation
/// holds the write guard for its whole read-modify-write, making the
/// find-or-create upsert atomic relative to concurrent recordings.
#[derive(Clone)]
pub struct InMemoryQueryHistory {
    rows: Arc<RwLock<Vec<HistoryEntry>>>,
    next_id: Arc<RwLock<i64>>,
    config: HistoryConfig,
}

impl InMemoryQueryHistory {
    /// Create an empty store with the given configuration
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(1)),
            config,
        }
    }

    fn evict_oldest(rows: &mut Vec<HistoryEntry>, n: usize) {
        for _ in 0..n {
            let Some(oldest) = rows
                .iter()
                .enumerate()
                .min_by_key(|(_, r)| r.created_at)
                .map(|(i, _)| i)
            else {
                return;
            };
            rows.remove(oldest);
        }
    }
}

impl Default for InMemoryQueryHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[async_trait::async_trait]
impl QueryHistory for InMemoryQueryHistory {
    async fn find_by_query_and_type(
        &self,
        normalized_query: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<Option<HistoryEntry>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| r.normalized_query == normalized_query && r.diabetes_type == diabetes_type)
            .cloned())
    }

    async fn record_lookup(&self, record: LookupRecord<'_>) -> AppResult<()> {
        let now = Utc::now();
        let mut rows = self.rows.write().await;

        if let Some(existing) = rows.iter_mut().find(|r| {
            r.normalized_query == record.normalized_query
                && r.diabetes_type == record.decision.diabetes_type
        }) {
            // Refresh display name and recency only; the stored verdict
            // and the favorite flag stay as they were.
            existing.display_name = record.display_name.to_owned();
            existing.created_at = now;
            tracing::debug!(
                query = record.normalized_query,
                favorite = existing.is_favorite,
                "updated history row, favorite preserved"
            );
            return Ok(());
        }

        if rows.len() >= self.config.max_entries {
            let excess = rows.len() - self.config.max_entries + 1;
            Self::evict_oldest(&mut rows, excess);
        }

        let mut next_id = self.next_id.write().await;
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        rows.push(HistoryEntry {
            id,
            normalized_query: record.normalized_query.to_owned(),
            display_name: record.display_name.to_owned(),
            diabetes_type: record.decision.diabetes_type,
            matched_key: record.matched_key.map(ToOwned::to_owned),
            suitability: record.decision.category,
            reason: record.decision.reason.clone(),
            portion_text: record.decision.portion_text.clone(),
            alternatives: record.decision.alternatives.clone(),
            sources_used: record.decision.source.clone(),
            created_at: now,
            is_favorite: false,
        });
        drop(rows);
        tracing::debug!(query = record.normalized_query, "inserted history row");
        Ok(())
    }

    async fn set_favorite(&self, id: i64, is_favorite: bool) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found(format!("history entry {id}")))?;
        row.is_favorite = is_favorite;
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<HistoryEntry>> {
        let rows = self.rows.read().await;
        let mut out: Vec<HistoryEntry> = rows.clone();
        out.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(out)
    }

    async fn list_favorites(&self) -> AppResult<Vec<HistoryEntry>> {
        let rows = self.rows.read().await;
        let mut out: Vec<HistoryEntry> = rows.iter().filter(|r| r.is_favorite).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn delete_oldest(&self, n: usize) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        Self::evict_oldest(&mut rows, n);
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}
