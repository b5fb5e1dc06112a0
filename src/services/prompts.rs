// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt templates for the two model flows, and the JSON schemas the model
//! output must follow.
//!
//! Rendering produces an ordered list of parts so images can sit inline
//! between text segments, the way the model API takes them.

use super::media::DataUri;
use crate::models::analysis::{MAX_RATING, MIN_RATING};
use crate::models::FaceAnalysis;
use serde_json::{json, Value};
use std::fmt::Write as _;

/// A named flow bound to its prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptDefinition {
    pub flow: &'static str,
    pub prompt: &'static str,
}

pub const ANALYZE_AND_RATE_FACE: PromptDefinition = PromptDefinition {
    flow: "analyzeAndRateFaceFlow",
    prompt: "analyzeAndRateFacePrompt",
};

pub const GET_STYLE_ADVICE: PromptDefinition = PromptDefinition {
    flow: "getStyleAdviceFlow",
    prompt: "getStyleAdvicePrompt",
};

/// One piece of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Media(DataUri),
}

const FACE_ANALYSIS_INSTRUCTIONS: &str = "\
You are a facial analysis expert. Your task is to analyze the user's face from the three photos provided (front, left, and right profiles) and provide a neutral, objective analysis.

You MUST perform the following steps:
1.  Identify the user's face shape (e.g., Oval, Square, Round, Heart, Diamond).
2.  Analyze and rate the following facial features on a scale of 1 to 10, where 1 is less prominent and 10 is very prominent: Jawline, Forehead, Nose, and Cheekbones.
3.  Provide a brief, objective description for each feature and for the overall face shape.
4.  Do NOT give any fashion advice, style recommendations, or compliments. Your analysis must be strictly neutral and descriptive.

Front View: ";

const STYLE_ADVICE_PREAMBLE: &str = "\
You are a world-class personal stylist and wellness coach. The user has provided their facial analysis results and is asking for specific advice.

Based on their analysis and their question, provide a concise, actionable, and encouraging response. You can suggest clothing styles, accessories, grooming tips, or facial exercises.

**User's Facial Analysis:**
";

/// Render the face analysis prompt with the three photos inline.
pub fn render_face_analysis(front: &DataUri, left: &DataUri, right: &DataUri) -> Vec<PromptPart> {
    vec![
        PromptPart::Text(FACE_ANALYSIS_INSTRUCTIONS.to_string()),
        PromptPart::Media(front.clone()),
        PromptPart::Text("\nLeft Profile: ".to_string()),
        PromptPart::Media(left.clone()),
        PromptPart::Text("\nRight Profile: ".to_string()),
        PromptPart::Media(right.clone()),
    ]
}

/// Render the style advice prompt. Values are inserted verbatim.
pub fn render_style_advice(analysis: &FaceAnalysis, user_query: &str) -> Vec<PromptPart> {
    let mut text = String::from(STYLE_ADVICE_PREAMBLE);

    // Writing to a String cannot fail.
    let _ = writeln!(
        text,
        "- Face Shape: {} ({})",
        analysis.face_shape.shape, analysis.face_shape.description
    );
    for feature in &analysis.feature_ratings {
        let _ = writeln!(
            text,
            "- {}: Rating {}/10 ({})",
            feature.name, feature.rating, feature.description
        );
    }
    let _ = write!(
        text,
        "\n**User's Question:**\n\"{user_query}\"\n\nProvide your expert advice below.\n"
    );

    vec![PromptPart::Text(text)]
}

/// Response schema for [`FaceAnalysis`], in the model API's schema dialect.
pub fn face_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "faceShape": {
                "type": "OBJECT",
                "properties": {
                    "shape": {
                        "type": "STRING",
                        "description": "The identified face shape (e.g., Oval, Square, Round)."
                    },
                    "description": {
                        "type": "STRING",
                        "description": "A brief, neutral description of the face shape characteristics."
                    }
                },
                "required": ["shape", "description"]
            },
            "featureRatings": {
                "type": "ARRAY",
                "description": "An array of ratings for various facial features.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {
                            "type": "STRING",
                            "description": "The name of the facial feature being rated (e.g., 'Jawline', 'Forehead')."
                        },
                        "rating": {
                            "type": "NUMBER",
                            "description": "A rating of the feature from 1 to 10.",
                            "minimum": MIN_RATING,
                            "maximum": MAX_RATING
                        },
                        "description": {
                            "type": "STRING",
                            "description": "A brief, neutral analysis of the feature's characteristics."
                        }
                    },
                    "required": ["name", "rating", "description"]
                }
            }
        },
        "required": ["faceShape", "featureRatings"]
    })
}

/// Response schema for [`crate::models::StyleAdvice`].
pub fn style_advice_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "advice": {
                "type": "STRING",
                "description": "The personalized advice or exercise recommendation."
            }
        },
        "required": ["advice"]
    })
}
