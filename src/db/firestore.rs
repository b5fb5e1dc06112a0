// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Document layout:
//! - `users/{uid}` (profile with nested subscription credits)
//! - `users/{uid}/analysisResults/{id}` (saved face analyses)
//!
//! Credit changes go through `run_transaction`, so the profile read is
//! registered for conflict detection and the body re-runs if another writer
//! commits first.

use super::{analyses_path, analysis_path, collections, profile_path, UserDataStore};
use crate::error::{AppError, Result};
use crate::models::{
    AnalysisResult, FaceShape, FeatureRating, NewProfile, ProfileUpdate, UserProfile,
};
use crate::time_utils::{normalize_rfc3339, now_rfc3339};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreDocument;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Result of a profile transaction body.
///
/// Refusals (no credits, already claimed) are values rather than errors: the
/// body writes nothing and the transaction runner has nothing to retry.
enum TxOutcome<T> {
    Done(T),
    Refused(AppError),
    Missing,
}

/// Analysis document body.
///
/// The ID lives only in the document name, the same way the web client
/// writes these documents. `createdAt` may be a string or a timestamp.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisDoc {
    #[serde(rename = "_firestore_id", skip_serializing)]
    id: String,
    user_id: String,
    face_shape: FaceShape,
    feature_ratings: Vec<FeatureRating>,
    image_urls: Vec<String>,
    created_at: String,
}

impl From<&AnalysisResult> for AnalysisDoc {
    fn from(record: &AnalysisResult) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            face_shape: record.face_shape.clone(),
            feature_ratings: record.feature_ratings.clone(),
            image_urls: record.image_urls.clone(),
            created_at: record.created_at.clone(),
        }
    }
}

impl From<AnalysisDoc> for AnalysisResult {
    fn from(doc: AnalysisDoc) -> Self {
        let created_at = normalize_rfc3339(&doc.created_at).unwrap_or(doc.created_at);
        Self {
            id: doc.id,
            user_id: doc.user_id,
            face_shape: doc.face_shape,
            feature_ratings: doc.feature_ratings,
            image_urls: doc.image_urls,
            created_at,
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Transactions ───────────────────────────────────────────

    /// Read-modify-write of one profile inside a Firestore transaction.
    ///
    /// `mutate` sees the transactional read. If it refuses, nothing is
    /// written. An analysis record it returns is created in the same commit.
    async fn mutate_profile_atomic<T, F>(
        &self,
        uid: &str,
        operation: &'static str,
        mutate: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&mut UserProfile) -> Result<(T, Option<AnalysisResult>)>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        let path = profile_path(uid);
        let tx_uid = uid.to_string();

        let outcome = self
            .get_client()?
            .run_transaction(move |db, transaction| {
                let uid = tx_uid.clone();
                let mutate = mutate.clone();
                async move {
                    mutate_profile_body(&db, transaction, &uid, mutate)
                        .await
                        .map_err(backoff::Error::permanent)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::from_store(&path, operation, e))?;

        match outcome {
            TxOutcome::Done(value) => Ok(value),
            TxOutcome::Refused(err) => Err(err),
            TxOutcome::Missing => Err(AppError::NotFound(format!(
                "User profile {} does not exist",
                path
            ))),
        }
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Decode an analysis document, whichever client wrote it.
    pub fn analysis_from_document(doc: &FirestoreDocument) -> Result<AnalysisResult> {
        firestore::FirestoreDb::deserialize_doc_to::<AnalysisDoc>(doc)
            .map(AnalysisResult::from)
            .map_err(|e| AppError::from_store(&doc.name, "get", e))
    }

    /// Delete analysis documents in transactional batches.
    async fn batch_delete_analyses(&self, uid: &str, ids: &[String]) -> Result<()> {
        let client = self.get_client()?;
        let collection_path = analyses_path(uid);
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::from_store(&collection_path, "delete", e))?;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::ANALYSIS_RESULTS)
                    .document_id(doc_id)
                    .parent(&parent_path)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection_path, e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::from_store(&collection_path, "delete", e))?;
        }

        Ok(())
    }
}

/// Transaction body shared by every credit operation.
async fn mutate_profile_body<T, F>(
    db: &firestore::FirestoreDb,
    transaction: &mut firestore::FirestoreTransaction<'_>,
    uid: &str,
    mutate: F,
) -> std::result::Result<TxOutcome<T>, FirestoreError>
where
    F: Fn(&mut UserProfile) -> Result<(T, Option<AnalysisResult>)>,
{
    let current: Option<UserProfile> = db
        .fluent()
        .select()
        .by_id_in(collections::USERS)
        .obj()
        .one(uid)
        .await?;

    let Some(mut profile) = current else {
        return Ok(TxOutcome::Missing);
    };

    let (value, new_record) = match mutate(&mut profile) {
        Ok(result) => result,
        Err(refusal) => return Ok(TxOutcome::Refused(refusal)),
    };

    db.fluent()
        .update()
        .in_col(collections::USERS)
        .document_id(uid)
        .object(&profile)
        .add_to_transaction(transaction)?;

    if let Some(record) = new_record {
        let parent_path = db.parent_path(collections::USERS, uid)?;
        db.fluent()
            .update()
            .in_col(collections::ANALYSIS_RESULTS)
            .document_id(&record.id)
            .parent(&parent_path)
            .object(&AnalysisDoc::from(&record))
            .add_to_transaction(transaction)?;
    }

    Ok(TxOutcome::Done(value))
}

/// Transaction body for the sign-in upsert.
async fn upsert_profile_body(
    db: &firestore::FirestoreDb,
    transaction: &mut firestore::FirestoreTransaction<'_>,
    identity: NewProfile,
) -> std::result::Result<UserProfile, FirestoreError> {
    let current: Option<UserProfile> = db
        .fluent()
        .select()
        .by_id_in(collections::USERS)
        .obj()
        .one(&identity.uid)
        .await?;

    let (profile, changed) = match current {
        Some(mut existing) => {
            let changed = existing.merge_identity(&identity);
            (existing, changed)
        }
        None => (UserProfile::new_from_identity(identity, now_rfc3339()), true),
    };

    if changed {
        db.fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(&profile)
            .add_to_transaction(transaction)?;
    }

    Ok(profile)
}

#[async_trait]
impl UserDataStore for FirestoreDb {
    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::from_store(&profile_path(uid), "get", e))
    }

    async fn upsert_profile(&self, identity: NewProfile) -> Result<UserProfile> {
        let path = profile_path(&identity.uid);

        let profile = self
            .get_client()?
            .run_transaction(move |db, transaction| {
                let identity = identity.clone();
                async move {
                    upsert_profile_body(&db, transaction, identity)
                        .await
                        .map_err(backoff::Error::permanent)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::from_store(&path, "create", e))?;

        tracing::info!(uid = %profile.uid, "Profile upserted");
        Ok(profile)
    }

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile> {
        self.mutate_profile_atomic(uid, "update", move |profile| {
            profile.apply_update(update.clone());
            Ok((profile.clone(), None))
        })
        .await
    }

    // ─── Credit Operations ───────────────────────────────────────

    async fn save_analysis(&self, uid: &str, record: AnalysisResult) -> Result<AnalysisResult> {
        let tx_record = record.clone();
        let remaining = self
            .mutate_profile_atomic(uid, "update", move |profile| {
                profile.subscription.spend_analysis()?;
                Ok((
                    profile.subscription.analyses_remaining,
                    Some(tx_record.clone()),
                ))
            })
            .await?;

        tracing::info!(
            uid,
            analysis_id = %record.id,
            remaining,
            "Analysis saved, credit spent"
        );

        Ok(record)
    }

    async fn decrement_advice_chats(&self, uid: &str) -> Result<u32> {
        self.mutate_profile_atomic(uid, "update", |profile| {
            profile.subscription.spend_advice_chat()?;
            Ok((profile.subscription.advice_chats_remaining, None))
        })
        .await
    }

    async fn claim_social_credit(&self, uid: &str) -> Result<UserProfile> {
        self.mutate_profile_atomic(uid, "update", |profile| {
            profile.subscription.claim_social_credit()?;
            Ok((profile.clone(), None))
        })
        .await
    }

    // ─── Analysis Operations ─────────────────────────────────────

    async fn list_analyses(&self, uid: &str) -> Result<Vec<AnalysisResult>> {
        let client = self.get_client()?;
        let path = analyses_path(uid);
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::from_store(&path, "list", e))?;

        let docs = client
            .fluent()
            .select()
            .from(collections::ANALYSIS_RESULTS)
            .parent(&parent_path)
            .query()
            .await
            .map_err(|e| AppError::from_store(&path, "list", e))?;

        let mut analyses = docs
            .iter()
            .map(Self::analysis_from_document)
            .collect::<Result<Vec<_>>>()?;

        // Sorted here: Firestore orders string and timestamp values apart.
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(analyses)
    }

    async fn get_analysis(&self, uid: &str, analysis_id: &str) -> Result<Option<AnalysisResult>> {
        let client = self.get_client()?;
        let path = analysis_path(uid, analysis_id);
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::from_store(&path, "get", e))?;

        client
            .fluent()
            .select()
            .by_id_in(collections::ANALYSIS_RESULTS)
            .parent(&parent_path)
            .one(analysis_id)
            .await
            .map_err(|e| AppError::from_store(&path, "get", e))?
            .map(|doc| Self::analysis_from_document(&doc))
            .transpose()
    }

    async fn delete_analysis(&self, uid: &str, analysis_id: &str) -> Result<()> {
        let client = self.get_client()?;
        let path = analysis_path(uid, analysis_id);
        let parent_path = client
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::from_store(&path, "delete", e))?;

        client
            .fluent()
            .delete()
            .from(collections::ANALYSIS_RESULTS)
            .document_id(analysis_id)
            .parent(&parent_path)
            .execute()
            .await
            .map_err(|e| AppError::from_store(&path, "delete", e))?;

        tracing::debug!(path = %path, "Deleted analysis");
        Ok(())
    }

    async fn delete_all_analyses(&self, uid: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .list_analyses(uid)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        let count = ids.len();
        self.batch_delete_analyses(uid, &ids).await?;

        tracing::debug!(uid, count, "Deleted all analyses");
        Ok(count)
    }

    // ─── User Data Deletion ─────────────────────────────────────────

    /// Delete all stored data for a user.
    ///
    /// Analyses go first so a failure part-way never leaves analyses behind
    /// without a profile that owns them.
    async fn delete_user_account(&self, uid: &str) -> Result<usize> {
        let mut deleted_count = self.delete_all_analyses(uid).await?;

        if self.get_profile(uid).await?.is_some() {
            let path = profile_path(uid);
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::USERS)
                .document_id(uid)
                .execute()
                .await
                .map_err(|e| AppError::from_store(&path, "delete", e))?;
            deleted_count += 1;
            tracing::debug!(uid, "Deleted user profile");
        }

        tracing::info!(uid, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
