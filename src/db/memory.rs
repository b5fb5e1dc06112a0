// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store.
//!
//! Used for `STORE_BACKEND=memory` runs and in tests. A profile's dashmap
//! entry guard is the atomic unit: every credit change happens while that
//! guard is held, and no guard is held across an await.

use super::{analysis_path, profile_path, UserDataStore};
use crate::error::{AppError, Result};
use crate::models::{AnalysisResult, NewProfile, ProfileUpdate, UserProfile};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory store keyed the same way as Firestore documents.
#[derive(Clone, Default)]
pub struct MemoryDb {
    /// `users/{uid}`
    profiles: Arc<DashMap<String, UserProfile>>,
    /// `users/{uid}/analysisResults/{id}`, grouped by uid
    analyses: Arc<DashMap<String, HashMap<String, AnalysisResult>>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a profile as is, replacing any existing one.
    ///
    /// Credits are normally granted outside the API (billing, console), so
    /// fixtures use this to set up paid or advice-enabled accounts.
    pub fn seed_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.uid.clone(), profile);
    }

    fn missing_profile(uid: &str) -> AppError {
        AppError::NotFound(format!("User profile {} does not exist", profile_path(uid)))
    }
}

#[async_trait]
impl UserDataStore for MemoryDb {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(uid).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, identity: NewProfile) -> Result<UserProfile> {
        match self.profiles.entry(identity.uid.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().merge_identity(&identity) {
                    tracing::debug!(uid = %identity.uid, "Profile identity refreshed");
                }
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let profile = UserProfile::new_from_identity(identity, now_rfc3339());
                tracing::info!(uid = %profile.uid, "Profile created");
                entry.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile> {
        let mut profile = self
            .profiles
            .get_mut(uid)
            .ok_or_else(|| Self::missing_profile(uid))?;
        profile.apply_update(update);
        Ok(profile.clone())
    }

    async fn save_analysis(&self, uid: &str, record: AnalysisResult) -> Result<AnalysisResult> {
        let mut profile = self
            .profiles
            .get_mut(uid)
            .ok_or_else(|| Self::missing_profile(uid))?;

        profile.subscription.spend_analysis()?;

        self.analyses
            .entry(uid.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());

        tracing::info!(
            uid,
            analysis_id = %record.id,
            remaining = profile.subscription.analyses_remaining,
            "Analysis saved, credit spent"
        );

        Ok(record)
    }

    async fn decrement_advice_chats(&self, uid: &str) -> Result<u32> {
        let mut profile = self
            .profiles
            .get_mut(uid)
            .ok_or_else(|| Self::missing_profile(uid))?;
        profile.subscription.spend_advice_chat()?;
        Ok(profile.subscription.advice_chats_remaining)
    }

    async fn claim_social_credit(&self, uid: &str) -> Result<UserProfile> {
        let mut profile = self
            .profiles
            .get_mut(uid)
            .ok_or_else(|| Self::missing_profile(uid))?;
        profile.subscription.claim_social_credit()?;
        Ok(profile.clone())
    }

    async fn list_analyses(&self, uid: &str) -> Result<Vec<AnalysisResult>> {
        let mut results: Vec<AnalysisResult> = self
            .analyses
            .get(uid)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn get_analysis(&self, uid: &str, analysis_id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self
            .analyses
            .get(uid)
            .and_then(|docs| docs.get(analysis_id).cloned()))
    }

    async fn delete_analysis(&self, uid: &str, analysis_id: &str) -> Result<()> {
        if let Some(mut docs) = self.analyses.get_mut(uid) {
            if docs.remove(analysis_id).is_some() {
                tracing::debug!(path = %analysis_path(uid, analysis_id), "Deleted analysis");
            }
        }
        Ok(())
    }

    async fn delete_all_analyses(&self, uid: &str) -> Result<usize> {
        let count = self
            .analyses
            .remove(uid)
            .map(|(_, docs)| docs.len())
            .unwrap_or(0);
        tracing::debug!(uid, count, "Deleted all analyses");
        Ok(count)
    }

    async fn delete_user_account(&self, uid: &str) -> Result<usize> {
        let mut deleted_count = self.delete_all_analyses(uid).await?;
        if self.profiles.remove(uid).is_some() {
            deleted_count += 1;
        }
        tracing::info!(uid, deleted_count, "User data deletion complete");
        Ok(deleted_count)
    }
}
