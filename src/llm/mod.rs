// ABOUTME: Generative-model fallback - prompt template, verdict schema, JSON extraction
// ABOUTME: GenerativeModel trait lets tests stub the remote completion call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// AI analyzer combining the generative model with the static estimate
pub mod estimator;
/// Google Gemini completion client
pub mod gemini;

pub use estimator::{AiAnalysis, AiAnalyzer};
pub use gemini::GeminiClient;

use serde::Deserialize;

use crate::errors::AppResult;
use crate::models::DiabetesType;

/// The fixed 4-field schema the model must answer in.
/// Any missing field or unparseable category falls back to the static
/// estimate; no medical validation happens beyond this structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AiVerdict {
    /// Suitability category string, e.g. "SMALL_PORTION"
    pub category: String,
    /// One-line explanation
    pub reason: String,
    /// Portion guidance text
    #[serde(rename = "safePortion")]
    pub safe_portion: String,
    /// Suggested swaps
    pub alternatives: Vec<String>,
}

/// Text-completion backend for food analysis
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Complete a prompt, returning the raw model text
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// Fixed analysis prompt: food name plus diabetes type, demanding
/// JSON-only output in the `AiVerdict` schema
#[must_use]
pub fn analysis_prompt(food_name: &str, diabetes_type: DiabetesType) -> String {
    format!(
        "You are a nutrition assistant focusing on diabetes-friendly guidance.\n\
         Food: {food_name}, DiabetesType: {diabetes_type}.\n\
         Return JSON ONLY in this format:\n\
         {{\n\
           \"category\": \"SAFE\" | \"SMALL_PORTION\" | \"LIMIT\" | \"AVOID\" | \"UNKNOWN\",\n\
           \"reason\": \"...\",\n\
           \"safePortion\": \"...\",\n\
           \"alternatives\": [\"...\", \"...\"]\n\
         }}"
    )
}

/// Extract the JSON object from a model response that may wrap it in a
/// fenced ```json code block. Without a fence the whole trimmed text is
/// returned.
#[must_use]
pub fn extract_json_block(text: &str) -> &str {
    let after_fence = text.find("```json").map_or(text, |i| &text[i + 7..]);
    let body = after_fence
        .rfind("```")
        .map_or(after_fence, |i| &after_fence[..i]);
    body.trim()
}
