// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data-access layer.
//!
//! [`UserDataStore`] is the seam between the HTTP layer and the document
//! store. Both backends apply the credit rules from [`crate::models::user`]
//! inside their own atomic unit.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::Result;
use crate::models::{AnalysisResult, NewProfile, ProfileUpdate, UserProfile};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Subcollection under `users/{uid}`
    pub const ANALYSIS_RESULTS: &str = "analysisResults";
}

/// Document path of a user's profile, as reported in errors.
pub fn profile_path(uid: &str) -> String {
    format!("{}/{}", collections::USERS, uid)
}

/// Path of a user's analysis collection.
pub fn analyses_path(uid: &str) -> String {
    format!(
        "{}/{}/{}",
        collections::USERS,
        uid,
        collections::ANALYSIS_RESULTS
    )
}

/// Path of one analysis document.
pub fn analysis_path(uid: &str, analysis_id: &str) -> String {
    format!("{}/{}", analyses_path(uid), analysis_id)
}

/// Per-user document operations.
#[async_trait]
pub trait UserDataStore: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;

    /// Create a free profile on first sign-in, or merge changed identity
    /// fields into the existing one. Credits are never reset.
    async fn upsert_profile(&self, identity: NewProfile) -> Result<UserProfile>;

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile>;

    // --- Credits ---

    /// Spend one analysis credit and create the analysis record in the same
    /// atomic unit. Fails with `NoCredits` when none are left and `NotFound`
    /// when the profile does not exist.
    async fn save_analysis(&self, uid: &str, record: AnalysisResult) -> Result<AnalysisResult>;

    /// Spend one advice-chat credit. Returns the remaining count.
    async fn decrement_advice_chats(&self, uid: &str) -> Result<u32>;

    async fn claim_social_credit(&self, uid: &str) -> Result<UserProfile>;

    // --- Analyses ---

    /// All analyses for a user, newest first.
    async fn list_analyses(&self, uid: &str) -> Result<Vec<AnalysisResult>>;

    async fn get_analysis(&self, uid: &str, analysis_id: &str) -> Result<Option<AnalysisResult>>;

    async fn delete_analysis(&self, uid: &str, analysis_id: &str) -> Result<()>;

    /// Remove every analysis under the user's namespace. Returns the count.
    async fn delete_all_analyses(&self, uid: &str) -> Result<usize>;

    /// Remove the user's analyses and profile. Returns the count.
    async fn delete_user_account(&self, uid: &str) -> Result<usize>;
}
