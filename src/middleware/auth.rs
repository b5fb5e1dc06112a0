// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token authentication middleware.

use crate::db::profile_path;
use crate::error::AppError;
use crate::models::NewProfile;
use crate::services::firebase_auth::{extract_bearer_token, AuthError, VerifiedUser};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie the hosting layer forwards to the backend.
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub sign_in_provider: Option<String>,
}

impl AuthUser {
    /// Require that `uid` names the caller's own namespace.
    pub fn ensure_owner(&self, uid: &str, operation: &str) -> Result<(), AppError> {
        if self.uid == uid {
            return Ok(());
        }
        Err(AppError::permission_denied(profile_path(uid), operation))
    }

    /// Identity fields used for the sign-in profile upsert.
    pub fn to_new_profile(&self) -> NewProfile {
        NewProfile {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

impl From<VerifiedUser> for AuthUser {
    fn from(user: VerifiedUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            sign_in_provider: user.sign_in_provider,
        }
    }
}

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => extract_bearer_token(request.headers().get(header::AUTHORIZATION))
            .map_err(|_| AppError::Unauthorized)?
            .to_string(),
    };

    let verified = state
        .token_verifier
        .verify_id_token(&token)
        .await
        .map_err(|e| match e {
            AuthError::Rejected(reason) => {
                tracing::debug!(reason = %reason, "ID token rejected");
                AppError::InvalidToken
            }
            AuthError::Transient(reason) => AppError::Unavailable(reason),
        })?;

    request.extensions_mut().insert(AuthUser::from(verified));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: None,
            display_name: Some("Ada".to_string()),
            photo_url: None,
            sign_in_provider: Some("google.com".to_string()),
        }
    }

    #[test]
    fn test_ensure_owner() {
        assert!(user("abc").ensure_owner("abc", "get").is_ok());
        assert!(matches!(
            user("abc").ensure_owner("xyz", "delete"),
            Err(AppError::PermissionDenied { path, operation })
                if path == "users/xyz" && operation == "delete"
        ));
    }

    #[test]
    fn test_new_profile_from_claims() {
        let profile = user("abc").to_new_profile();
        assert_eq!(profile.uid, "abc");
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    }
}
