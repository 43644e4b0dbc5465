// ABOUTME: Google Gemini completion client via the Generative Language API
// ABOUTME: Single-turn generateContent call returning the first candidate's text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::GenerativeModel;
use crate::errors::{AppError, AppResult};

/// Placeholder value that counts as no key at all
const API_KEY_PLACEHOLDER: &str = "YOUR_GEMINI_API_KEY_HERE";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// Whether a configured key is real enough to attempt a call with
#[must_use]
pub fn is_usable_api_key(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.trim().is_empty() && k != API_KEY_PLACEHOLDER)
}

/// Google Gemini completion client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client against the given base URL (no trailing slash)
    #[must_use]
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl GenerativeModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_owned(),
                }],
            }],
        };

        debug!(model = %self.model, "sending Gemini analysis request");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "Gemini API error");
            return Err(AppError::external_service(
                "Gemini",
                format!("generateContent returned status {status}"),
            ));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response("Gemini", e.to_string()))?;

        if let Some(err) = body.error {
            return Err(AppError::external_service("Gemini", err.message));
        }

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                AppError::malformed_response("Gemini", "response carried no candidate text")
            })
    }
}
