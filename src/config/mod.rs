// ABOUTME: Application configuration loaded from environment variables
// ABOUTME: API credentials, base URL overrides, store bounds, HTTP timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::constants::{limits, remote};
use crate::history::HistoryConfig;
use crate::llm::gemini::is_usable_api_key;

/// Top-level application configuration.
///
/// Everything is environment-driven with constants as defaults; no config
/// file is read. Missing credentials are not errors here: a `None` USDA
/// key disables that tier and a `None` Gemini key routes the AI fallback
/// to the static estimate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// USDA FoodData Central API key (`FDC_API_KEY`)
    pub fdc_api_key: Option<String>,
    /// Gemini API key (`GEMINI_API_KEY`); placeholder values count as absent
    pub gemini_api_key: Option<String>,
    /// Gemini model name (`GEMINI_MODEL`)
    pub gemini_model: String,
    /// Open Food Facts base URL (`OFF_BASE_URL`)
    pub off_base_url: String,
    /// USDA FoodData Central base URL (`USDA_BASE_URL`)
    pub usda_base_url: String,
    /// Gemini base URL (`GEMINI_BASE_URL`)
    pub gemini_base_url: String,
    /// Cache store bounds and TTL
    pub cache: CacheConfig,
    /// History store bound
    pub history: HistoryConfig,
    /// Overall HTTP request timeout
    pub http_timeout: Duration,
    /// HTTP connect timeout
    pub http_connect_timeout: Duration,
    /// SQLite database URL (`DATABASE_URL`); `None` selects in-memory stores
    pub database_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fdc_api_key: None,
            gemini_api_key: None,
            gemini_model: remote::GEMINI_DEFAULT_MODEL.to_owned(),
            off_base_url: remote::OFF_BASE_URL.to_owned(),
            usda_base_url: remote::USDA_BASE_URL.to_owned(),
            gemini_base_url: remote::GEMINI_BASE_URL.to_owned(),
            cache: CacheConfig::default(),
            history: HistoryConfig::default(),
            http_timeout: Duration::from_secs(remote::DEFAULT_TIMEOUT_SECS),
            http_connect_timeout: Duration::from_secs(remote::DEFAULT_CONNECT_TIMEOUT_SECS),
            database_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let gemini_api_key = env::var("GEMINI_API_KEY").ok();
        let gemini_api_key = if is_usable_api_key(gemini_api_key.as_deref()) {
            gemini_api_key
        } else {
            None
        };

        Self {
            fdc_api_key: env::var("FDC_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| remote::GEMINI_DEFAULT_MODEL.to_owned()),
            off_base_url: env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| remote::OFF_BASE_URL.to_owned()),
            usda_base_url: env::var("USDA_BASE_URL")
                .unwrap_or_else(|_| remote::USDA_BASE_URL.to_owned()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| remote::GEMINI_BASE_URL.to_owned()),
            cache: CacheConfig {
                ttl: Duration::from_secs(
                    env::var("CACHE_TTL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(limits::CACHE_TTL_SECS),
                ),
                max_entries: env::var("CACHE_MAX_ENTRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(limits::MAX_CACHE_SIZE),
            },
            history: HistoryConfig {
                max_entries: env::var("HISTORY_MAX_ENTRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(limits::MAX_HISTORY_SIZE),
            },
            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(remote::DEFAULT_TIMEOUT_SECS),
            ),
            http_connect_timeout: Duration::from_secs(
                env::var("HTTP_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(remote::DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
        }
    }
}
