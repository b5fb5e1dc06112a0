// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inline image payloads (`data:` URIs) sent by the capture UI.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Largest decoded image accepted per photo.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A parsed `data:<mime>;base64,<payload>` URI.
///
/// The payload is kept base64-encoded since that is what the model API
/// expects; it is only decoded once to validate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    /// Parse and validate an image data URI.
    ///
    /// `label` names the photo in error messages (e.g. "frontPhotoDataUri").
    pub fn parse(label: &str, uri: &str) -> Result<Self, AppError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AppError::BadRequest(format!("{label} must be a data: URI")))?;

        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::BadRequest(format!("{label} is missing its payload")))?;

        let mime_type = meta.strip_suffix(";base64").ok_or_else(|| {
            AppError::BadRequest(format!("{label} must use base64 encoding"))
        })?;

        if !mime_type.starts_with("image/") || mime_type.len() == "image/".len() {
            return Err(AppError::BadRequest(format!(
                "{label} must be an image, got '{mime_type}'"
            )));
        }

        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| AppError::BadRequest(format!("{label} is not valid base64: {e}")))?;

        if decoded.is_empty() {
            return Err(AppError::BadRequest(format!("{label} is empty")));
        }

        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest(format!(
                "{label} exceeds {} MiB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    /// Reassemble the URI form.
    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}
