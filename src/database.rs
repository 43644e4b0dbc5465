// ABOUTME: SQLite persistence for the nutrition cache and query history
// ABOUTME: One pool, inline migrations, both store traits implemented on it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::cache::{CacheConfig, CacheEntry, CacheKey, NutritionCache};
use crate::errors::{AppError, AppResult};
use crate::history::{HistoryConfig, LookupRecord, QueryHistory};
use crate::models::{DiabetesType, FoodItem, HistoryEntry, Suitability};

/// SQLite-backed store implementing both the cache and history traits.
///
/// Nutrition records are stored as JSON blobs keyed by the cache-key
/// string; history rows are fully columnar so listing never deserializes
/// record payloads. Timestamps are RFC 3339 text, which sorts correctly
/// under SQLite's default collation.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    cache_config: CacheConfig,
    history_config: HistoryConfig,
}

impl Database {
    /// Open (creating if absent) the database at `database_url` and run
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a `DatabaseError` when the connection or a migration fails.
    pub async fn new(
        database_url: &str,
        cache_config: CacheConfig,
        history_config: HistoryConfig,
    ) -> AppResult<Self> {
        // SQLite only creates the file with mode=rwc
        let connection_options = if database_url.starts_with("sqlite:") && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options).await?;
        let db = Self {
            pool,
            cache_config,
            history_config,
        };
        db.migrate().await?;
        info!(url = %database_url, "database ready");
        Ok(db)
    }

    /// Run schema migrations
    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS food_cache (
                key TEXT PRIMARY KEY,
                item_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_food_cache_updated_at ON food_cache(updated_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_text TEXT NOT NULL,
                display_name TEXT NOT NULL,
                diabetes_type TEXT NOT NULL,
                matched_key TEXT,
                suitability TEXT NOT NULL,
                reason TEXT NOT NULL,
                portion_text TEXT NOT NULL,
                alternatives TEXT NOT NULL,
                sources_used TEXT NOT NULL,
                created_at TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                UNIQUE (query_text, diabetes_type)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_created_at ON history(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<CacheEntry> {
        let key: String = row.try_get("key")?;
        let item_json: String = row.try_get("item_json")?;
        let updated_at: String = row.try_get("updated_at")?;
        let item: FoodItem = serde_json::from_str(&item_json)?;
        Ok(CacheEntry {
            key,
            item,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn history_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<HistoryEntry> {
        let diabetes_type: String = row.try_get("diabetes_type")?;
        let suitability: String = row.try_get("suitability")?;
        let alternatives: String = row.try_get("alternatives")?;
        let created_at: String = row.try_get("created_at")?;
        Ok(HistoryEntry {
            id: row.try_get("id")?,
            normalized_query: row.try_get("query_text")?,
            display_name: row.try_get("display_name")?,
            diabetes_type: DiabetesType::from_str(&diabetes_type)?,
            matched_key: row.try_get("matched_key")?,
            suitability: Suitability::from_str(&suitability)?,
            reason: row.try_get("reason")?,
            portion_text: row.try_get("portion_text")?,
            alternatives: serde_json::from_str(&alternatives)?,
            sources_used: row.try_get("sources_used")?,
            created_at: parse_timestamp(&created_at)?,
            is_favorite: row.try_get("is_favorite")?,
        })
    }
}

fn parse_timestamp(text: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("invalid stored timestamp '{text}': {e}")))
}

#[async_trait]
impl NutritionCache for Database {
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let row = sqlx::query("SELECT key, item_json, updated_at FROM food_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::entry_from_row).transpose()
    }

    async fn put(&self, key: &CacheKey, item: &FoodItem) -> AppResult<()> {
        let key = key.to_string();
        let item_json = serde_json::to_string(item)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM food_cache WHERE key = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?;

        // Eviction applies only when a brand-new key would exceed the bound
        if exists.is_none() {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM food_cache")
                .fetch_one(&mut *tx)
                .await?;
            let bound = i64::try_from(self.cache_config.max_entries).unwrap_or(i64::MAX);
            if count >= bound {
                let excess = count - bound + 1;
                sqlx::query(
                    r"
                    DELETE FROM food_cache WHERE key IN (
                        SELECT key FROM food_cache ORDER BY updated_at ASC LIMIT ?
                    )
                    ",
                )
                .bind(excess)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r"
            INSERT INTO food_cache (key, item_json, updated_at) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET item_json = excluded.item_json,
                                            updated_at = excluded.updated_at
            ",
        )
        .bind(&key)
        .bind(&item_json)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM food_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn delete_oldest(&self, n: usize) -> AppResult<()> {
        sqlx::query(
            r"
            DELETE FROM food_cache WHERE key IN (
                SELECT key FROM food_cache ORDER BY updated_at ASC LIMIT ?
            )
            ",
        )
        .bind(i64::try_from(n).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM food_cache")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QueryHistory for Database {
    async fn find_by_query_and_type(
        &self,
        normalized_query: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<Option<HistoryEntry>> {
        let row = sqlx::query(
            "SELECT * FROM history WHERE query_text = ? AND diabetes_type = ?",
        )
        .bind(normalized_query)
        .bind(diabetes_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::history_from_row).transpose()
    }

    async fn record_lookup(&self, record: LookupRecord<'_>) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let diabetes_type = record.decision.diabetes_type.as_str();

        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM history WHERE query_text = ? AND diabetes_type = ?",
        )
        .bind(record.normalized_query)
        .bind(diabetes_type)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(id) = existing {
            // Refresh only display name and recency; the stored verdict
            // and the favorite flag stay as they were.
            sqlx::query("UPDATE history SET display_name = ?, created_at = ? WHERE id = ?")
                .bind(record.display_name)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        } else {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
                .fetch_one(&mut *tx)
                .await?;
            let bound = i64::try_from(self.history_config.max_entries).unwrap_or(i64::MAX);
            if count >= bound {
                let excess = count - bound + 1;
                sqlx::query(
                    r"
                    DELETE FROM history WHERE id IN (
                        SELECT id FROM history ORDER BY created_at ASC LIMIT ?
                    )
                    ",
                )
                .bind(excess)
                .execute(&mut *tx)
                .await?;
            }

            let alternatives = serde_json::to_string(&record.decision.alternatives)?;
            sqlx::query(
                r"
                INSERT INTO history (query_text, display_name, diabetes_type, matched_key,
                                     suitability, reason, portion_text, alternatives,
                                     sources_used, created_at, is_favorite)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
                ",
            )
            .bind(record.normalized_query)
            .bind(record.display_name)
            .bind(diabetes_type)
            .bind(record.matched_key)
            .bind(record.decision.category.as_str())
            .bind(&record.decision.reason)
            .bind(&record.decision.portion_text)
            .bind(&alternatives)
            .bind(&record.decision.source)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_favorite(&self, id: i64, is_favorite: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE history SET is_favorite = ? WHERE id = ?")
            .bind(is_favorite)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("history entry {id}")));
        }
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM history ORDER BY is_favorite DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::history_from_row).collect()
    }

    async fn list_favorites(&self) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM history WHERE is_favorite = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::history_from_row).collect()
    }

    async fn count(&self) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn delete_oldest(&self, n: usize) -> AppResult<()> {
        sqlx::query(
            r"
            DELETE FROM history WHERE id IN (
                SELECT id FROM history ORDER BY created_at ASC LIMIT ?
            )
            ",
        )
        .bind(i64::try_from(n).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM history")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
