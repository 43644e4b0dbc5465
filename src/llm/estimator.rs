// ABOUTME: AI fallback tier - generative verdict with a static estimate underneath
// ABOUTME: Always terminates successfully; every failure degrades to the estimate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::{analysis_prompt, extract_json_block, AiVerdict, GenerativeModel};
use crate::cache::CacheKey;
use crate::errors::AppResult;
use crate::models::{normalize_query, Decision, DiabetesType, FoodItem, FoodSource, Suitability};

/// Output of the AI fallback: the record, its verdict, and the cache key
/// (`ai:` for a model verdict, `ai_estimate:` for the static estimate)
#[derive(Debug, Clone)]
pub struct AiAnalysis {
    /// The resolved record
    pub item: FoodItem,
    /// The verdict; for this tier it comes from the model (or the fixed
    /// estimate text), not from the decision engine
    pub decision: Decision,
    /// Cache key this record belongs under
    pub cache_key: CacheKey,
}

/// Final resolution tier. Never fails: a missing/placeholder credential
/// skips the network call entirely, and any model or parse failure
/// degrades to the static estimate.
#[derive(Clone)]
pub struct AiAnalyzer {
    model: Option<Arc<dyn GenerativeModel>>,
}

impl AiAnalyzer {
    /// Analyzer backed by a generative model
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Analyzer with no model configured; always answers with the
    /// static estimate
    #[must_use]
    pub fn without_model() -> Self {
        Self { model: None }
    }

    /// Analyze one food for one diabetes type
    pub async fn analyze(&self, query_text: &str, diabetes_type: DiabetesType) -> AiAnalysis {
        let Some(model) = &self.model else {
            warn!("generative model not configured, using static estimate");
            return Self::static_estimate(query_text, diabetes_type);
        };

        match Self::model_verdict(model.as_ref(), query_text, diabetes_type).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "generative analysis failed, using static estimate");
                Self::static_estimate(query_text, diabetes_type)
            }
        }
    }

    async fn model_verdict(
        model: &dyn GenerativeModel,
        query_text: &str,
        diabetes_type: DiabetesType,
    ) -> AppResult<AiAnalysis> {
        let prompt = analysis_prompt(query_text, diabetes_type);
        let raw = model.complete(&prompt).await?;

        let verdict: AiVerdict = serde_json::from_str(extract_json_block(&raw))?;
        let category = Suitability::from_str(&verdict.category)?;

        let display_name = capitalize(query_text);
        let item = FoodItem::named(&display_name, FoodSource::Ai);
        let decision = Decision {
            category,
            reason: verdict.reason,
            portion_text: verdict.safe_portion,
            alternatives: verdict.alternatives,
            source: FoodSource::Ai.to_string(),
            diabetes_type,
        };
        let cache_key = CacheKey::Ai(normalize_query(query_text), diabetes_type);
        Ok(AiAnalysis {
            item,
            decision,
            cache_key,
        })
    }

    /// Fixed low-confidence estimate used when the model is unavailable
    #[must_use]
    pub fn static_estimate(query_text: &str, diabetes_type: DiabetesType) -> AiAnalysis {
        let display_name = capitalize(query_text);
        let item = FoodItem {
            name: display_name.clone(),
            brand: None,
            carbs_per_100g: Some(15.0),
            sugars_per_100g: Some(5.0),
            fiber_per_100g: Some(2.0),
            energy_kcal_per_100g: None,
            country_tags: Vec::new(),
            source: FoodSource::AiEstimate,
            resolved_at: Utc::now(),
        };
        let decision = Decision {
            category: Suitability::SmallPortion,
            reason: format!(
                "Estimated values for {display_name} - AI analysis not available or API key missing."
            ),
            portion_text: "Approximate values (100g portion) - verify with healthcare provider."
                .to_owned(),
            alternatives: vec![
                "Consult a nutritionist".to_owned(),
                "Check detailed nutrition info".to_owned(),
            ],
            source: FoodSource::AiEstimate.to_string(),
            diabetes_type,
        };
        let cache_key = CacheKey::AiEstimate(normalize_query(query_text), diabetes_type);
        AiAnalysis {
            item,
            decision,
            cache_key,
        }
    }
}

/// Uppercase the first character, leaving the rest untouched
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
