// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Analysis workflow: photos in, saved analysis out; plus advice chat turns.
//!
//! Credit checks here are best-effort and only avoid paying for a model call
//! that could never be saved. The authoritative check is the store's atomic
//! spend.

use super::ai::{AiFlows, AnalyzeFaceInput, StyleAdviceInput};
use super::media::DataUri;
use crate::db::{analysis_path, profile_path, UserDataStore};
use crate::error::{AppError, CreditKind, Result};
use crate::models::{AnalysisResult, UserProfile};
use crate::time_utils::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Longest accepted advice question, in characters.
pub const MAX_QUERY_CHARS: usize = 2000;

/// Body of `POST /api/users/{uid}/analyses`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub front_photo_data_uri: String,
    pub left_photo_data_uri: String,
    pub right_photo_data_uri: String,
    /// Storage references for the three photos, if the client uploaded them
    #[validate(length(equal = 3))]
    pub image_urls: Option<Vec<String>>,
}

/// Body of `POST /api/users/{uid}/advice`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    #[validate(length(min = 1, max = 128))]
    pub analysis_id: String,
    pub user_query: String,
}

/// Result of one advice chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceResponse {
    pub advice: String,
    pub advice_chats_remaining: u32,
}

/// Stored photos must fit in one record, whose store limit is 1 MiB.
pub const MAX_INLINE_IMAGE_BYTES: usize = 900 * 1024;

/// Image references for a request without `imageUrls`: the photos
/// themselves, front, left, right.
fn inline_image_urls(input: &AnalyzeFaceInput) -> Result<Vec<String>> {
    let urls: Vec<String> = [&input.front_photo, &input.left_photo, &input.right_photo]
        .into_iter()
        .map(DataUri::to_uri)
        .collect();

    let total: usize = urls.iter().map(String::len).sum();
    if total > MAX_INLINE_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "Photos total {total} bytes, over the {MAX_INLINE_IMAGE_BYTES}-byte inline limit; \
             upload them and pass imageUrls"
        )));
    }

    Ok(urls)
}

/// Coordinates the store and the model flows.
#[derive(Clone)]
pub struct AnalysisService {
    db: Arc<dyn UserDataStore>,
    ai: Arc<dyn AiFlows>,
}

impl AnalysisService {
    pub fn new(db: Arc<dyn UserDataStore>, ai: Arc<dyn AiFlows>) -> Self {
        Self { db, ai }
    }

    async fn require_profile(&self, uid: &str) -> Result<UserProfile> {
        self.db.get_profile(uid).await?.ok_or_else(|| {
            AppError::NotFound(format!("User profile {} does not exist", profile_path(uid)))
        })
    }

    /// Analyze three photos and save the result, spending one analysis credit.
    pub async fn analyze_and_save(
        &self,
        uid: &str,
        request: AnalyzeRequest,
    ) -> Result<AnalysisResult> {
        request.validate()?;

        let input = AnalyzeFaceInput {
            front_photo: DataUri::parse("frontPhotoDataUri", &request.front_photo_data_uri)?,
            left_photo: DataUri::parse("leftPhotoDataUri", &request.left_photo_data_uri)?,
            right_photo: DataUri::parse("rightPhotoDataUri", &request.right_photo_data_uri)?,
        };

        let image_urls = match request.image_urls {
            Some(urls) => urls,
            None => inline_image_urls(&input)?,
        };

        let profile = self.require_profile(uid).await?;
        if profile.subscription.analyses_remaining == 0 {
            return Err(AppError::NoCredits(CreditKind::Analysis));
        }

        let analysis = self.ai.analyze_and_rate_face(input).await?;

        let record = AnalysisResult::new(uid, analysis, image_urls, now_rfc3339());
        self.db.save_analysis(uid, record).await
    }

    /// Answer one advice question about a saved analysis.
    ///
    /// The advice credit is spent before the model call and is not refunded
    /// if the call fails.
    pub async fn request_style_advice(
        &self,
        uid: &str,
        request: AdviceRequest,
    ) -> Result<AdviceResponse> {
        request.validate()?;

        let user_query = request.user_query.trim();
        if user_query.is_empty() {
            return Err(AppError::BadRequest("userQuery must not be empty".to_string()));
        }
        if user_query.chars().count() > MAX_QUERY_CHARS {
            return Err(AppError::BadRequest(format!(
                "userQuery must be at most {MAX_QUERY_CHARS} characters"
            )));
        }

        let profile = self.require_profile(uid).await?;
        if profile.subscription.advice_chats_remaining == 0 {
            return Err(AppError::NoCredits(CreditKind::AdviceChat));
        }

        let analysis = self
            .db
            .get_analysis(uid, &request.analysis_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Analysis {} does not exist",
                    analysis_path(uid, &request.analysis_id)
                ))
            })?;

        let advice_chats_remaining = self.db.decrement_advice_chats(uid).await?;

        let advice = self
            .ai
            .get_style_advice(StyleAdviceInput {
                analysis_result: analysis.to_face_analysis(),
                user_query: user_query.to_string(),
            })
            .await?;

        tracing::info!(
            uid,
            analysis_id = %analysis.id,
            advice_chats_remaining,
            "Style advice delivered"
        );

        Ok(AdviceResponse {
            advice: advice.advice,
            advice_chats_remaining,
        })
    }
}
