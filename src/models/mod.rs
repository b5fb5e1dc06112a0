// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod analysis;
pub mod plan;
pub mod user;

pub use analysis::{AnalysisResult, FaceAnalysis, FaceShape, FeatureRating, StyleAdvice};
pub use plan::Plan;
pub use user::{NewProfile, ProfileUpdate, Subscription, UserProfile};
