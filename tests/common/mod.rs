// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use reflect_ai::config::Config;
use reflect_ai::db::{FirestoreDb, MemoryDb, UserDataStore};
use reflect_ai::error::{AppError, Result};
use reflect_ai::models::{FaceAnalysis, FaceShape, FeatureRating, StyleAdvice};
use reflect_ai::routes::create_router;
use reflect_ai::services::{
    AiFlows, AnalysisService, AnalyzeFaceInput, FirebaseTokenVerifier, StyleAdviceInput,
};
use reflect_ai::AppState;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";
#[allow(dead_code)]
const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_private.pem");
#[allow(dead_code)]
const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_rsa_public.pem");

/// Tiny valid PNG header, enough for data URI validation.
#[allow(dead_code)]
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Canned model flows that count their calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubAi {
    pub face_calls: AtomicUsize,
    pub advice_calls: AtomicUsize,
    /// When set, the advice flow fails as if the model API errored.
    pub fail_advice: bool,
}

#[allow(dead_code)]
impl StubAi {
    pub fn face_calls(&self) -> usize {
        self.face_calls.load(Ordering::SeqCst)
    }

    pub fn advice_calls(&self) -> usize {
        self.advice_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiFlows for StubAi {
    async fn analyze_and_rate_face(&self, _input: AnalyzeFaceInput) -> Result<FaceAnalysis> {
        self.face_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FaceAnalysis {
            face_shape: FaceShape {
                shape: "Oval".to_string(),
                description: "Length slightly exceeds width.".to_string(),
            },
            feature_ratings: ["Jawline", "Forehead", "Nose", "Cheekbones"]
                .iter()
                .map(|name| FeatureRating {
                    name: name.to_string(),
                    rating: 6.0,
                    description: format!("{name} is average."),
                })
                .collect(),
        })
    }

    async fn get_style_advice(&self, input: StyleAdviceInput) -> Result<StyleAdvice> {
        self.advice_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_advice {
            return Err(AppError::AiModel("stub failure".to_string()));
        }
        Ok(StyleAdvice {
            advice: format!(
                "With an {} face, {}",
                input.analysis_result.face_shape.shape, input.user_query
            ),
        })
    }
}

/// Handles for a test app backed by the in-memory store.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub ai: Arc<StubAi>,
}

/// Create a test app with in-memory store, stub model and static-key verifier.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_ai(StubAi::default())
}

#[allow(dead_code)]
pub fn create_test_app_with_ai(ai: StubAi) -> TestApp {
    let config = Config::test_default();
    let db = MemoryDb::new();
    let ai = Arc::new(ai);

    let store: Arc<dyn UserDataStore> = Arc::new(db.clone());
    let analysis_service = AnalysisService::new(store.clone(), ai.clone());

    let decoding_key =
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).expect("test public key");
    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, decoding_key)
            .expect("static verifier"),
    );

    let state = Arc::new(AppState {
        config,
        db: store,
        analysis_service,
        token_verifier,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        ai,
    }
}

#[allow(dead_code)]
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Standard Firebase ID token claims for `uid`.
#[allow(dead_code)]
pub fn id_token_claims(config: &Config, uid: &str) -> Value {
    let now = now_secs();
    json!({
        "iss": config.token_issuer(),
        "aud": config.firebase_project_id,
        "sub": uid,
        "user_id": uid,
        "iat": now - 10,
        "auth_time": now - 10,
        "exp": now + 3600,
        "email": format!("{uid}@example.com"),
        "name": "Test User",
        "picture": "https://example.com/avatar.png",
        "firebase": {"sign_in_provider": "google.com"}
    })
}

/// Sign arbitrary claims with the test key.
#[allow(dead_code)]
pub fn sign_claims(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).expect("test private key");
    encode(&header, claims, &key).expect("sign test token")
}

/// A valid ID token for `uid`.
#[allow(dead_code)]
pub fn create_test_id_token(config: &Config, uid: &str) -> String {
    sign_claims(&id_token_claims(config, uid), TEST_KID)
}

/// Build a JSON request with a bearer token.
#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Request body for a valid analysis submission.
#[allow(dead_code)]
pub fn analyze_body() -> Value {
    json!({
        "frontPhotoDataUri": PNG_DATA_URI,
        "leftPhotoDataUri": PNG_DATA_URI,
        "rightPhotoDataUri": PNG_DATA_URI,
    })
}
