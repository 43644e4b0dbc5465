// ABOUTME: Core data structures for nutrition records and suitability decisions
// ABOUTME: FoodItem, DiabetesType, Suitability, Decision, HistoryEntry, FoodResolution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Diabetes subtype the decision engine tailors its verdict to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiabetesType {
    /// Type 1 diabetes
    #[serde(rename = "TYPE_1")]
    Type1,
    /// Type 2 diabetes
    #[serde(rename = "TYPE_2")]
    Type2,
}

impl DiabetesType {
    /// Canonical string form, matching the persisted representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Type1 => "TYPE_1",
            Self::Type2 => "TYPE_2",
        }
    }

    /// Lowercased form used inside AI cache keys
    #[must_use]
    pub fn key_fragment(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for DiabetesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiabetesType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TYPE_1" | "TYPE1" | "1" => Ok(Self::Type1),
            "TYPE_2" | "TYPE2" | "2" => Ok(Self::Type2),
            other => Err(AppError::invalid_input(format!(
                "Unknown diabetes type: {other}"
            ))),
        }
    }
}

/// Which tier produced a nutrition record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodSource {
    /// Open Food Facts public API
    #[serde(rename = "OFF")]
    Off,
    /// USDA FoodData Central
    #[serde(rename = "USDA")]
    Usda,
    /// Generative-model analysis
    #[serde(rename = "AI")]
    Ai,
    /// Static estimate used when the generative model is unavailable
    #[serde(rename = "AI_ESTIMATE")]
    AiEstimate,
    /// Bundled offline regional dataset
    #[serde(rename = "LOCAL_DB")]
    LocalDb,
}

impl FoodSource {
    /// Canonical string form, matching the persisted representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Usda => "USDA",
            Self::Ai => "AI",
            Self::AiEstimate => "AI_ESTIMATE",
            Self::LocalDb => "LOCAL_DB",
        }
    }

    /// Whether this record came from the generative tier (either variant)
    #[must_use]
    pub const fn is_ai(&self) -> bool {
        matches!(self, Self::Ai | Self::AiEstimate)
    }
}

impl fmt::Display for FoodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Self::Off),
            "USDA" => Ok(Self::Usda),
            "AI" => Ok(Self::Ai),
            "AI_ESTIMATE" => Ok(Self::AiEstimate),
            "LOCAL_DB" => Ok(Self::LocalDb),
            other => Err(AppError::internal(format!("Unknown food source: {other}"))),
        }
    }
}

/// Suitability verdict categories, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suitability {
    /// Freely suitable
    #[serde(rename = "SAFE")]
    Safe,
    /// Suitable in a small portion
    #[serde(rename = "SMALL_PORTION")]
    SmallPortion,
    /// Should be limited
    #[serde(rename = "LIMIT")]
    Limit,
    /// Should be avoided
    #[serde(rename = "AVOID")]
    Avoid,
    /// Could not be classified
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Suitability {
    /// Canonical string form, matching the persisted representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::SmallPortion => "SMALL_PORTION",
            Self::Limit => "LIMIT",
            Self::Avoid => "AVOID",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Suitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suitability {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SAFE" => Ok(Self::Safe),
            "SMALL_PORTION" => Ok(Self::SmallPortion),
            "LIMIT" => Ok(Self::Limit),
            "AVOID" => Ok(Self::Avoid),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(AppError::internal(format!(
                "Unknown suitability category: {other}"
            ))),
        }
    }
}

/// A resolved nutrition record, normalized to per-100g values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    /// Display name of the food
    pub name: String,
    /// Brand, when the source reports one
    pub brand: Option<String>,
    /// Carbohydrate grams per 100g
    pub carbs_per_100g: Option<f64>,
    /// Sugar grams per 100g
    pub sugars_per_100g: Option<f64>,
    /// Fiber grams per 100g
    pub fiber_per_100g: Option<f64>,
    /// Energy in kcal per 100g
    pub energy_kcal_per_100g: Option<f64>,
    /// Country tags reported by the source
    pub country_tags: Vec<String>,
    /// Tier that produced this record
    pub source: FoodSource,
    /// When this record was resolved
    pub resolved_at: DateTime<Utc>,
}

impl FoodItem {
    /// Create a record with just a name and source; nutrition fields unset
    #[must_use]
    pub fn named(name: impl Into<String>, source: FoodSource) -> Self {
        Self {
            name: name.into(),
            brand: None,
            carbs_per_100g: None,
            sugars_per_100g: None,
            fiber_per_100g: None,
            energy_kcal_per_100g: None,
            country_tags: Vec::new(),
            source,
            resolved_at: Utc::now(),
        }
    }

    /// Net carbs per 100g: carbs minus fiber, floored at zero.
    /// Absent values are treated as zero.
    #[must_use]
    pub fn net_carbs_per_100g(&self) -> f64 {
        let carbs = self.carbs_per_100g.unwrap_or(0.0);
        let fiber = self.fiber_per_100g.unwrap_or(0.0);
        (carbs - fiber).max(0.0)
    }
}

/// Suitability decision for one food and one diabetes type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Verdict category
    pub category: Suitability,
    /// One-line explanation for the verdict
    pub reason: String,
    /// Portion guidance text, e.g. "20g portion. Keep portions small; …"
    pub portion_text: String,
    /// Suggested swaps, best first
    pub alternatives: Vec<String>,
    /// Source string of the record the decision was made from
    pub source: String,
    /// Diabetes type the decision was made for
    pub diabetes_type: DiabetesType,
}

/// One row of the per-(query, diabetes-type) lookup history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Surrogate key assigned by the store
    pub id: i64,
    /// Normalized (lowercased, trimmed) query text
    pub normalized_query: String,
    /// Actual resolved name, for display
    pub display_name: String,
    /// Diabetes type this lookup was made for
    pub diabetes_type: DiabetesType,
    /// Cache key of the backing nutrition record, when one exists
    pub matched_key: Option<String>,
    /// Verdict category at resolution time
    pub suitability: Suitability,
    /// Verdict reason at resolution time
    pub reason: String,
    /// Portion guidance at resolution time
    pub portion_text: String,
    /// Suggested alternatives at resolution time
    pub alternatives: Vec<String>,
    /// Source tier(s) that produced the record, e.g. "OFF"
    pub sources_used: String,
    /// Creation or last-refresh time; recency ordering key
    pub created_at: DateTime<Utc>,
    /// Soft favorite flag; mutated only by the explicit toggle
    pub is_favorite: bool,
}

/// Successful output of the orchestrator: the record plus its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodResolution {
    /// The resolved nutrition record
    pub item: FoodItem,
    /// The suitability decision for the requested diabetes type
    pub decision: Decision,
}

/// Normalize a user query: lowercase and trim surrounding whitespace
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
