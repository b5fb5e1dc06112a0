// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent credit spending: with N credits, exactly N requests succeed.

use reflect_ai::db::{MemoryDb, UserDataStore};
use reflect_ai::error::{AppError, CreditKind};
use reflect_ai::models::{AnalysisResult, FaceAnalysis, FaceShape, NewProfile};
use std::sync::Arc;

const CREDITS: u32 = 3;
const ATTEMPTS: usize = 16;

async fn seeded_db() -> MemoryDb {
    let db = MemoryDb::new();
    let mut profile = db
        .upsert_profile(NewProfile {
            uid: "racer".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    profile.subscription.analyses_remaining = CREDITS;
    profile.subscription.advice_chats_remaining = CREDITS;
    db.seed_profile(profile);
    db
}

fn record() -> AnalysisResult {
    AnalysisResult::new(
        "racer",
        FaceAnalysis {
            face_shape: FaceShape {
                shape: "Round".to_string(),
                description: "Soft.".to_string(),
            },
            feature_ratings: vec![],
        },
        vec!["f".into(), "l".into(), "r".into()],
        "2026-04-01T00:00:00.000Z".to_string(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_never_overspend() {
    let db = Arc::new(seeded_db().await);

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.save_analysis("racer", record()).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::NoCredits(CreditKind::Analysis)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, CREDITS as usize);
    assert_eq!(db.list_analyses("racer").await.unwrap().len(), CREDITS as usize);
    let profile = db.get_profile("racer").await.unwrap().unwrap();
    assert_eq!(profile.subscription.analyses_remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_advice_never_goes_negative() {
    let db = Arc::new(seeded_db().await);

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.decrement_advice_chats("racer").await })
        })
        .collect();

    let mut remaining_seen = Vec::new();
    for handle in handles {
        if let Ok(remaining) = handle.await.unwrap() {
            remaining_seen.push(remaining);
        }
    }

    remaining_seen.sort_unstable();
    assert_eq!(remaining_seen, vec![0, 1, 2]);
    let profile = db.get_profile("racer").await.unwrap().unwrap();
    assert_eq!(profile.subscription.advice_chats_remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_social_claims_grant_once() {
    let db = Arc::new(seeded_db().await);

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.claim_social_credit("racer").await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(granted, 1);
    let profile = db.get_profile("racer").await.unwrap().unwrap();
    assert_eq!(profile.subscription.analyses_remaining, CREDITS + 1);
}
