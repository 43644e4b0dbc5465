// ABOUTME: Application constants organized by domain
// ABOUTME: Store limits, decision thresholds, remote endpoints, nutrient ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// Store size bounds and time-to-live policy
pub mod limits {
    /// Cached nutrition records older than this are treated as a miss (30 days)
    pub const CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
    /// Maximum nutrition-cache entries before oldest-first eviction
    pub const MAX_CACHE_SIZE: usize = 500;
    /// Maximum history rows before oldest-first eviction
    pub const MAX_HISTORY_SIZE: usize = 300;
}

/// Decision-engine thresholds (grams per 100g unless noted)
pub mod thresholds {
    /// Sugars at or above this are AVOID outright
    pub const SUGARS_AVOID: f64 = 20.0;
    /// Sugars at or above this are LIMIT
    pub const SUGARS_LIMIT: f64 = 15.0;
    /// Net carbs at or above this are LIMIT
    pub const NET_CARBS_LIMIT: f64 = 35.0;
    /// Net carbs at or below this are SAFE
    pub const NET_CARBS_SAFE: f64 = 5.0;
    /// Fiber at or above this downgrades severity one step
    pub const FIBER_HELPS: f64 = 5.0;
    /// Type 2: sugars at or above this escalate SMALL_PORTION to LIMIT
    pub const TYPE2_SUGARS_ESCALATE: f64 = 12.0;
    /// Type 2: net carbs above this escalate SMALL_PORTION to LIMIT
    pub const TYPE2_NET_CARBS_ESCALATE: f64 = 30.0;
    /// Net carb grams a suggested portion should deliver
    pub const TARGET_NET_CARBS_PER_SERVING: f64 = 15.0;
    /// Smallest portion ever suggested, in grams
    pub const PORTION_MIN_GRAMS: f64 = 20.0;
    /// Largest portion ever suggested, in grams
    pub const PORTION_MAX_GRAMS: f64 = 300.0;
}

/// Remote endpoints and request defaults
pub mod remote {
    /// Open Food Facts production base URL
    pub const OFF_BASE_URL: &str = "https://world.openfoodfacts.org";
    /// USDA FoodData Central base URL
    pub const USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc";
    /// Google Generative Language API base URL
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    /// Default Gemini model for food analysis
    pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
    /// User-Agent sent to Open Food Facts (required by their API policy)
    pub const USER_AGENT: &str = "CarbSense/0.1 (carbsense@example.com)";
    /// Page size requested from search endpoints; only the first hit is used
    pub const SEARCH_PAGE_SIZE: u32 = 10;
    /// Fields requested from Open Food Facts
    pub const OFF_FIELDS: &str = "code,product_name,brands,countries_tags_en,categories_tags,carbohydrates_100g,sugars_100g,fiber_100g,energy-kcal_100g";
    /// Maximum attempts against a rate-limited endpoint
    pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;
    /// Base backoff in milliseconds; delay = base * attempt^2
    pub const RATE_LIMIT_BACKOFF_BASE_MS: u64 = 500;
    /// Request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Connection timeout in seconds
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// USDA FoodData Central nutrient-id vocabulary
pub mod nutrient_ids {
    /// Carbohydrate, by difference
    pub const CARBOHYDRATE: u32 = 1005;
    /// Total sugars
    pub const SUGARS_TOTAL: u32 = 2000;
    /// Fiber, total dietary
    pub const FIBER_TOTAL_DIETARY: u32 = 1079;
}

/// Offline dataset restrictions
pub mod offline {
    /// Region tags the offline dataset is restricted to
    pub const REGION_TAGS: &[&str] = &["india", "pakistan", "bangladesh", "nepal"];
}
