// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ReflectAI: AI face analysis and style advice
//!
//! This crate provides the backend API: Firebase-authenticated profiles with
//! credit-metered face analyses, saved results, and advice chat.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserDataStore;
use services::{AnalysisService, FirebaseTokenVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn UserDataStore>,
    pub analysis_service: AnalysisService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
