// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and account routes for authenticated users.

use crate::db::profile_path;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ProfileUpdate, UserProfile};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via ID token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/users/{uid}/profile", post(sync_profile))
        .route(
            "/api/users/{uid}",
            get(get_profile).patch(update_profile).delete(delete_account),
        )
        .route("/api/users/{uid}/social-credit", post(claim_social_credit))
}

fn profile_not_found(uid: &str) -> AppError {
    AppError::NotFound(format!("User profile {} does not exist", profile_path(uid)))
}

// ─── User Profile ────────────────────────────────────────────

/// Get the caller's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| profile_not_found(&user.uid))?;

    Ok(Json(profile))
}

/// Create the profile on first sign-in, or refresh identity fields.
///
/// Identity comes from the verified token, never from the request body.
async fn sync_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>> {
    user.ensure_owner(&uid, "create")?;

    let profile = state.db.upsert_profile(user.to_new_profile()).await?;
    Ok(Json(profile))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>> {
    user.ensure_owner(&uid, "get")?;

    let profile = state
        .db
        .get_profile(&uid)
        .await?
        .ok_or_else(|| profile_not_found(&uid))?;

    Ok(Json(profile))
}

/// Update display name and/or photo URL.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    user.ensure_owner(&uid, "update")?;
    update.validate()?;

    if update.is_empty() {
        return Err(AppError::BadRequest(
            "Nothing to update: provide displayName or photoURL".to_string(),
        ));
    }

    let profile = state.db.update_profile(&uid, update).await?;
    tracing::info!(uid = %uid, "Profile updated");

    Ok(Json(profile))
}

// ─── Credits ─────────────────────────────────────────────────

/// One-time social-follow bonus of an extra analysis credit.
async fn claim_social_credit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>> {
    user.ensure_owner(&uid, "update")?;

    let profile = state.db.claim_social_credit(&uid).await?;
    tracing::info!(
        uid = %uid,
        analyses_remaining = profile.subscription.analyses_remaining,
        "Social credit claimed"
    );

    Ok(Json(profile))
}

// ─── Account Deletion ────────────────────────────────────────

/// Response for account deletion.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted_count: usize,
    pub message: String,
}

/// Delete the user's analyses and profile.
///
/// Removing the sign-in account itself is left to the client, which holds
/// the fresh credential the identity provider requires for that.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<DeleteAccountResponse>> {
    user.ensure_owner(&uid, "delete")?;

    tracing::info!(uid = %uid, "User-initiated account deletion");
    let deleted_count = state.db.delete_user_account(&uid).await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        deleted_count,
        message: "Your account data has been deleted.".to_string(),
    }))
}
