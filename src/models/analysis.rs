// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Face analysis output and the stored analysis record.

use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lowest rating the model may give a feature.
pub const MIN_RATING: f64 = 1.0;
/// Highest rating the model may give a feature.
pub const MAX_RATING: f64 = 10.0;

/// Identified face shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FaceShape {
    /// e.g. Oval, Square, Round, Heart, Diamond
    #[validate(length(min = 1, max = 64))]
    pub shape: String,
    #[validate(length(min = 1))]
    pub description: String,
}

/// Rating of a single facial feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeatureRating {
    /// Feature name (e.g. "Jawline", "Forehead")
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(range(min = MIN_RATING, max = MAX_RATING))]
    pub rating: f64,
    #[validate(length(min = 1))]
    pub description: String,
}

/// Output of the face analysis flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FaceAnalysis {
    #[validate(nested)]
    pub face_shape: FaceShape,
    #[validate(nested)]
    pub feature_ratings: Vec<FeatureRating>,
}

/// Analysis record stored at `users/{uid}/analysisResults/{id}`.
///
/// Immutable once written; the only later change is deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AnalysisResult {
    /// Server-generated ID (also used as document ID)
    pub id: String,
    /// Owner's uid
    pub user_id: String,
    pub face_shape: FaceShape,
    pub feature_ratings: Vec<FeatureRating>,
    /// Front, left and right image references, in that order
    pub image_urls: Vec<String>,
    /// When the analysis was saved (RFC 3339)
    pub created_at: String,
}

impl AnalysisResult {
    /// Wrap a flow output into a new record owned by `user_id`.
    pub fn new(
        user_id: &str,
        analysis: FaceAnalysis,
        image_urls: Vec<String>,
        created_at: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            face_shape: analysis.face_shape,
            feature_ratings: analysis.feature_ratings,
            image_urls,
            created_at,
        }
    }

    /// The analysis part of the record, as fed to the advice flow.
    pub fn to_face_analysis(&self) -> FaceAnalysis {
        FaceAnalysis {
            face_shape: self.face_shape.clone(),
            feature_ratings: self.feature_ratings.clone(),
        }
    }
}

/// Output of the style advice flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StyleAdvice {
    #[validate(length(min = 1))]
    pub advice: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_analysis() -> FaceAnalysis {
        FaceAnalysis {
            face_shape: FaceShape {
                shape: "Oval".to_string(),
                description: "Balanced proportions.".to_string(),
            },
            feature_ratings: vec![
                FeatureRating {
                    name: "Jawline".to_string(),
                    rating: 7.0,
                    description: "Moderately defined.".to_string(),
                },
                FeatureRating {
                    name: "Nose".to_string(),
                    rating: 4.5,
                    description: "Straight bridge.".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_valid_analysis_passes() {
        assert!(sample_analysis().validate().is_ok());
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        let mut analysis = sample_analysis();
        analysis.feature_ratings[0].rating = 11.0;
        assert!(analysis.validate().is_err());

        analysis.feature_ratings[0].rating = 0.5;
        assert!(analysis.validate().is_err());

        analysis.feature_ratings[0].rating = MIN_RATING;
        analysis.feature_ratings[1].rating = MAX_RATING;
        assert!(analysis.validate().is_ok());
    }

    #[test]
    fn test_empty_shape_is_rejected() {
        let mut analysis = sample_analysis();
        analysis.face_shape.shape.clear();
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_record_keeps_rating_order() {
        let record = AnalysisResult::new(
            "uid-1",
            sample_analysis(),
            vec!["a".into(), "b".into(), "c".into()],
            "2026-01-01T00:00:00Z".into(),
        );
        assert_eq!(record.user_id, "uid-1");
        assert_eq!(record.feature_ratings[0].name, "Jawline");
        assert_eq!(record.feature_ratings[1].name, "Nose");
        assert_eq!(record.to_face_analysis(), sample_analysis());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "uid-1");
        assert_eq!(json["faceShape"]["shape"], "Oval");
        assert_eq!(json["featureRatings"][1]["rating"], 4.5);
        assert_eq!(json["imageUrls"].as_array().unwrap().len(), 3);
    }
}
