// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ai;
pub mod analysis;
pub mod firebase_auth;
pub mod gemini;
pub mod media;
pub mod prompts;

pub use ai::{AiFlows, AnalyzeFaceInput, StyleAdviceInput};
pub use analysis::AnalysisService;
pub use firebase_auth::{AuthError, FirebaseTokenVerifier, VerifiedUser};
pub use gemini::GeminiClient;
pub use media::DataUri;
