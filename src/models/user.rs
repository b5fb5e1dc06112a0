// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and subscription credits.
//!
//! Field names follow the existing web client's documents (camelCase), so
//! profiles written by either side stay readable.

use crate::error::{AppError, CreditKind};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Plan every new profile starts on.
pub const FREE_PLAN_NAME: &str = "Free";
/// Analyses granted to a new profile.
pub const INITIAL_ANALYSES: u32 = 1;
/// Advice chats granted to a new profile.
pub const INITIAL_ADVICE_CHATS: u32 = 0;
/// Analyses granted by the one-time social credit.
pub const SOCIAL_CREDIT_ANALYSES: u32 = 1;

/// Subscription record nested in the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Subscription {
    pub plan_name: String,
    #[serde(default)]
    pub analyses_remaining: u32,
    #[serde(default)]
    pub advice_chats_remaining: u32,
    #[serde(rename = "instagramCreditClaimed", default)]
    pub social_credit_claimed: bool,
}

impl Subscription {
    /// Subscription for a freshly created profile.
    pub fn new_free() -> Self {
        Self {
            plan_name: FREE_PLAN_NAME.to_string(),
            analyses_remaining: INITIAL_ANALYSES,
            advice_chats_remaining: INITIAL_ADVICE_CHATS,
            social_credit_claimed: false,
        }
    }

    /// Spend one analysis credit, refusing to go below zero.
    pub fn spend_analysis(&mut self) -> Result<(), AppError> {
        self.analyses_remaining = self
            .analyses_remaining
            .checked_sub(1)
            .ok_or(AppError::NoCredits(CreditKind::Analysis))?;
        Ok(())
    }

    /// Spend one advice-chat credit, refusing to go below zero.
    pub fn spend_advice_chat(&mut self) -> Result<(), AppError> {
        self.advice_chats_remaining = self
            .advice_chats_remaining
            .checked_sub(1)
            .ok_or(AppError::NoCredits(CreditKind::AdviceChat))?;
        Ok(())
    }

    /// Grant the one-time social credit.
    pub fn claim_social_credit(&mut self) -> Result<(), AppError> {
        if self.social_credit_claimed {
            return Err(AppError::Conflict(
                "Social credit has already been claimed".to_string(),
            ));
        }
        self.social_credit_claimed = true;
        self.analyses_remaining = self.analyses_remaining.saturating_add(SOCIAL_CREDIT_ANALYSES);
        Ok(())
    }
}

/// User profile stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    /// Identity-provider user ID (also used as document ID)
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// When the profile was first created (RFC 3339)
    pub created_at: String,
    pub subscription: Subscription,
}

/// Identity fields used to create or refresh a profile at sign-in.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// Build a brand-new profile on the free plan.
    pub fn new_from_identity(identity: NewProfile, created_at: String) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
            photo_url: identity.photo_url,
            created_at,
            subscription: Subscription::new_free(),
        }
    }

    /// Refresh display name and photo from a later sign-in.
    ///
    /// Only non-empty values that differ from what is stored are applied;
    /// credits and `createdAt` are never touched. Returns whether anything
    /// changed.
    pub fn merge_identity(&mut self, identity: &NewProfile) -> bool {
        let mut changed = false;

        if let Some(name) = identity.display_name.as_deref().filter(|n| !n.is_empty()) {
            if self.display_name.as_deref() != Some(name) {
                self.display_name = Some(name.to_string());
                changed = true;
            }
        }

        if let Some(photo) = identity.photo_url.as_deref().filter(|p| !p.is_empty()) {
            if self.photo_url.as_deref() != Some(photo) {
                self.photo_url = Some(photo.to_string());
                changed = true;
            }
        }

        changed
    }

    /// Apply a user-initiated profile edit.
    pub fn apply_update(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.display_name {
            self.display_name = Some(name);
        }
        if let Some(photo) = update.photo_url {
            self.photo_url = Some(photo);
        }
    }
}

/// Profile edit request body.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(url, length(max = 2048))]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}
