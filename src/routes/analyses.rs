// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Face analysis and advice chat routes.

use crate::db::analysis_path;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::AnalysisResult;
use crate::services::analysis::{AdviceRequest, AdviceResponse, AnalyzeRequest};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users/{uid}/analyses",
            get(list_analyses)
                .post(create_analysis)
                .delete(delete_all_analyses),
        )
        .route(
            "/api/users/{uid}/analyses/{id}",
            get(get_analysis).delete(delete_analysis),
        )
        .route("/api/users/{uid}/advice", post(request_advice))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AnalysesResponse {
    pub analyses: Vec<AnalysisResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAnalysesResponse {
    pub success: bool,
    pub deleted_count: usize,
}

/// List the user's saved analyses, newest first.
async fn list_analyses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<AnalysesResponse>> {
    user.ensure_owner(&uid, "list")?;

    let analyses = state.db.list_analyses(&uid).await?;
    Ok(Json(AnalysesResponse { analyses }))
}

/// Run the face analysis on three photos and save the result.
async fn create_analysis(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<AnalysisResult>)> {
    user.ensure_owner(&uid, "create")?;

    let saved = state.analysis_service.analyze_and_save(&uid, request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((uid, id)): Path<(String, String)>,
) -> Result<Json<AnalysisResult>> {
    user.ensure_owner(&uid, "get")?;

    let analysis = state.db.get_analysis(&uid, &id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Analysis {} does not exist", analysis_path(&uid, &id)))
    })?;

    Ok(Json(analysis))
}

async fn delete_analysis(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((uid, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    user.ensure_owner(&uid, "delete")?;

    state.db.delete_analysis(&uid, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete all analysis data but keep the account.
async fn delete_all_analyses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<DeleteAnalysesResponse>> {
    user.ensure_owner(&uid, "delete")?;

    let deleted_count = state.db.delete_all_analyses(&uid).await?;
    tracing::info!(uid = %uid, deleted_count, "User analysis data deleted");

    Ok(Json(DeleteAnalysesResponse {
        success: true,
        deleted_count,
    }))
}

/// One advice chat turn about a saved analysis.
async fn request_advice(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(request): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>> {
    user.ensure_owner(&uid, "update")?;

    let response = state
        .analysis_service
        .request_style_advice(&uid, request)
        .await?;
    Ok(Json(response))
}
