// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini client against a local mock of the generateContent endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use reflect_ai::config::Config;
use reflect_ai::error::AppError;
use reflect_ai::models::{FaceAnalysis, FaceShape};
use reflect_ai::services::{
    AiFlows, AnalyzeFaceInput, DataUri, GeminiClient, StyleAdviceInput,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    response: Value,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn mock_generate(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.captured.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    (state.status, axum::Json(state.response))
}

/// Start a mock model API; returns the client and the captured requests.
async fn start_mock(
    status: StatusCode,
    response: Value,
) -> (GeminiClient, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(mock_generate).with_state(MockState {
        status,
        response,
        captured: captured.clone(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = Config::test_default();
    config.gemini_base_url = format!("http://{addr}/v1beta");
    config.gemini_model = "gemini-test".to_string();

    (GeminiClient::new(&config).unwrap(), captured)
}

fn candidate_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn photos() -> AnalyzeFaceInput {
    let photo = |tag: &str| DataUri {
        mime_type: "image/jpeg".to_string(),
        data: tag.to_string(),
    };
    AnalyzeFaceInput {
        front_photo: photo("RlJPTlQ="),
        left_photo: photo("TEVGVA=="),
        right_photo: photo("UklHSFQ="),
    }
}

#[tokio::test]
async fn test_face_analysis_request_and_response() {
    let output = json!({
        "faceShape": {"shape": "Diamond", "description": "Narrow forehead and jaw."},
        "featureRatings": [
            {"name": "Jawline", "rating": 6, "description": "Tapered."},
            {"name": "Cheekbones", "rating": 8.5, "description": "High."}
        ]
    });
    let (client, captured) = start_mock(StatusCode::OK, candidate_text(&output.to_string())).await;

    let analysis = client.analyze_and_rate_face(photos()).await.unwrap();
    assert_eq!(analysis.face_shape.shape, "Diamond");
    assert_eq!(analysis.feature_ratings[1].rating, 8.5);

    let requests = captured.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(request.api_key.as_deref(), Some("test_gemini_key"));

    let parts = request.body["contents"][0]["parts"].as_array().unwrap();
    let inline: Vec<&str> = parts
        .iter()
        .filter_map(|p| p["inlineData"]["data"].as_str())
        .collect();
    assert_eq!(inline, ["RlJPTlQ=", "TEVGVA==", "UklHSFQ="]);
    assert_eq!(
        request.body["generationConfig"]["responseSchema"]["required"],
        json!(["faceShape", "featureRatings"])
    );
}

#[tokio::test]
async fn test_style_advice_round_trip() {
    let (client, captured) = start_mock(
        StatusCode::OK,
        candidate_text(r#"{"advice": "Try a textured crop."}"#),
    )
    .await;

    let advice = client
        .get_style_advice(StyleAdviceInput {
            analysis_result: FaceAnalysis {
                face_shape: FaceShape {
                    shape: "Square".to_string(),
                    description: "Strong jaw.".to_string(),
                },
                feature_ratings: vec![],
            },
            user_query: "Haircut ideas?".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(advice.advice, "Try a textured crop.");

    let requests = captured.lock().unwrap();
    let prompt = requests[0].body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("- Face Shape: Square (Strong jaw.)"));
    assert!(prompt.contains("\"Haircut ideas?\""));
}

#[tokio::test]
async fn test_rate_limit_is_model_error() {
    let (client, _) = start_mock(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}),
    )
    .await;

    let err = client.analyze_and_rate_face(photos()).await.unwrap_err();
    assert!(matches!(err, AppError::AiModel(msg) if msg.contains("rate limited")));
}

#[tokio::test]
async fn test_server_error_is_model_error() {
    let (client, _) = start_mock(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": {"code": 500}}),
    )
    .await;

    let err = client.analyze_and_rate_face(photos()).await.unwrap_err();
    assert!(matches!(err, AppError::AiModel(msg) if msg.contains("500")));
}

#[tokio::test]
async fn test_non_json_output_is_model_error() {
    let (client, _) = start_mock(StatusCode::OK, candidate_text("Sorry, I can't help.")).await;

    let err = client.analyze_and_rate_face(photos()).await.unwrap_err();
    assert!(matches!(err, AppError::AiModel(msg) if msg.contains("schema")));
}
