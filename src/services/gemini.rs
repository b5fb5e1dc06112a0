// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini REST client implementing the model flows.
//!
//! Handles:
//! - Structured output (`responseMimeType` + `responseSchema`)
//! - Inline image parts
//! - Rate limit and blocked-prompt detection
//! - Validation of the decoded output before it reaches the caller

use super::ai::{AiFlows, AnalyzeFaceInput, StyleAdviceInput};
use super::prompts::{self, PromptDefinition, PromptPart};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{FaceAnalysis, StyleAdvice};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use validator::Validate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed building Gemini HTTP client")?;

        Ok(Self {
            http,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Run one prompt and decode the structured output as `T`.
    async fn generate<T>(
        &self,
        definition: PromptDefinition,
        parts: Vec<PromptPart>,
        response_schema: Value,
    ) -> Result<T>
    where
        T: DeserializeOwned + Validate,
    {
        let request = GenerateContentRequest::new(parts, response_schema);

        tracing::debug!(
            flow = definition.flow,
            prompt = definition.prompt,
            model = %self.model,
            "Calling model"
        );

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::AiModel(format!("{}: request failed: {}", definition.flow, e)))?;

        let body: GenerateContentResponse = self.check_response_json(definition, response).await?;
        let output: T = decode_output(definition, body)?;

        tracing::info!(flow = definition.flow, "Model flow completed");
        Ok(output)
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        definition: PromptDefinition,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!(flow = definition.flow, "Gemini rate limit hit (429)");
                return Err(AppError::AiModel(format!(
                    "{}: rate limited by model API",
                    definition.flow
                )));
            }

            return Err(AppError::AiModel(format!(
                "{}: HTTP {}: {}",
                definition.flow, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::AiModel(format!("{}: JSON parse error: {}", definition.flow, e)))
    }
}

#[async_trait]
impl AiFlows for GeminiClient {
    async fn analyze_and_rate_face(&self, input: AnalyzeFaceInput) -> Result<FaceAnalysis> {
        let parts = prompts::render_face_analysis(
            &input.front_photo,
            &input.left_photo,
            &input.right_photo,
        );
        self.generate(
            prompts::ANALYZE_AND_RATE_FACE,
            parts,
            prompts::face_analysis_schema(),
        )
        .await
    }

    async fn get_style_advice(&self, input: StyleAdviceInput) -> Result<StyleAdvice> {
        let parts = prompts::render_style_advice(&input.analysis_result, &input.user_query);
        self.generate(prompts::GET_STYLE_ADVICE, parts, prompts::style_advice_schema())
            .await
    }
}

/// Pull the structured output out of a response and validate it.
fn decode_output<T>(definition: PromptDefinition, response: GenerateContentResponse) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(AppError::AiModel(format!(
            "{}: prompt blocked ({})",
            definition.flow, reason
        )));
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        AppError::AiModel(format!("{}: response had no candidates", definition.flow))
    })?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::AiModel(format!(
            "{}: empty output (finish reason {})",
            definition.flow,
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let output: T = serde_json::from_str(text.trim()).map_err(|e| {
        AppError::AiModel(format!(
            "{}: output does not match schema: {}",
            definition.flow, e
        ))
    })?;

    output.validate().map_err(|e| {
        AppError::AiModel(format!(
            "{}: output failed validation: {}",
            definition.flow, e
        ))
    })?;

    Ok(output)
}

// ─── Wire Types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn new(parts: Vec<PromptPart>, response_schema: Value) -> Self {
        let parts = parts
            .into_iter()
            .map(|part| match part {
                PromptPart::Text(text) => Part::Text(text),
                PromptPart::Media(media) => Part::InlineData(Blob {
                    mime_type: media.mime_type,
                    data: media.data,
                }),
            })
            .collect();

        Self {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(Blob),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
