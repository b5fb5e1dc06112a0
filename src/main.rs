// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ReflectAI API Server
//!
//! Serves profiles, credit-metered face analyses and style advice to the
//! ReflectAI web client.

use reflect_ai::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, UserDataStore},
    services::{AnalysisService, FirebaseTokenVerifier, GeminiClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting ReflectAI API");

    let db: Arc<dyn UserDataStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.firebase_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let gemini = GeminiClient::new(&config)?;
    tracing::info!(model = %config.gemini_model, "Gemini client initialized");

    let analysis_service = AnalysisService::new(db.clone(), Arc::new(gemini));

    let token_verifier = Arc::new(FirebaseTokenVerifier::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        analysis_service,
        token_verifier,
    });

    // Build router
    let app = reflect_ai::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reflect_ai=debug".parse()?)
                .add_directive("permission_error=warn".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
