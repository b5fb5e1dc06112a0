// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Model flows as seen by the rest of the app.
//!
//! The workflow only talks to [`AiFlows`]; `GeminiClient` is the production
//! implementation and tests substitute canned responses.

use super::media::DataUri;
use crate::error::Result;
use crate::models::{FaceAnalysis, StyleAdvice};
use async_trait::async_trait;

/// Input of the face analysis flow: front, left and right photos.
#[derive(Debug, Clone)]
pub struct AnalyzeFaceInput {
    pub front_photo: DataUri,
    pub left_photo: DataUri,
    pub right_photo: DataUri,
}

/// Input of the style advice flow.
#[derive(Debug, Clone)]
pub struct StyleAdviceInput {
    pub analysis_result: FaceAnalysis,
    pub user_query: String,
}

#[async_trait]
pub trait AiFlows: Send + Sync {
    /// Identify face shape and rate features. Output is schema-validated.
    async fn analyze_and_rate_face(&self, input: AnalyzeFaceInput) -> Result<FaceAnalysis>;

    /// Answer a question about a saved analysis.
    async fn get_style_advice(&self, input: StyleAdviceInput) -> Result<StyleAdvice>;
}
