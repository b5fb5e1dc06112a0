// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by `securetoken@system.gserviceaccount.com`.
//! Signing keys rotate, so they are fetched by `kid` and cached for the
//! lifetime the key endpoint advertises.

use crate::config::Config;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Identity extracted from a verified Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// e.g. `google.com` or `password`
    pub sign_in_provider: Option<String>,
}

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The token is missing/invalid or claims do not match expectations.
    Rejected(String),
    /// Signing keys could not be fetched; the token may well be fine.
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Firebase,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct DiscoveryCacheEntry {
    jwks_uri: String,
    expires_at: Instant,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase Authentication ID tokens.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    project_id: String,
    expected_issuer: String,
    discovery_url: String,
    mode: VerifierMode,
    discovery_cache: RwLock<Option<DiscoveryCacheEntry>>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Create a production verifier that discovers and caches securetoken keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::with_mode(config, VerifierMode::Firebase)?;

        tracing::info!(
            project_id = %verifier.project_id,
            expected_issuer = %verifier.expected_issuer,
            "Initialized Firebase ID token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static token kid must not be empty");
        }

        Self::with_mode(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building token verifier HTTP client")?;

        let expected_issuer = config.token_issuer();
        let discovery_url = format!("{}/.well-known/openid-configuration", expected_issuer);

        Ok(Self {
            http_client,
            project_id: config.firebase_project_id.clone(),
            expected_issuer,
            discovery_url,
            mode,
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a raw ID token string.
    pub async fn verify_id_token(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::Rejected(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::Rejected("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| AuthError::Rejected(format!("JWT validation failed: {e}")))?;

        let claims = token_data.claims;

        validate_subject(&claims.sub)?;
        validate_not_future("iat", claims.iat)?;
        validate_not_future("auth_time", claims.auth_time)?;

        let sign_in_provider = claims
            .firebase
            .as_ref()
            .and_then(|f| f.sign_in_provider.as_deref());
        tracing::debug!(
            uid = %claims.sub,
            sign_in_provider = ?sign_in_provider,
            exp = claims.exp,
            "Firebase ID token verified"
        );

        Ok(VerifiedUser {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            photo_url: claims.picture,
            sign_in_provider: claims.firebase.and_then(|f| f.sign_in_provider),
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(AuthError::Rejected(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Firebase => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(AuthError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await;
        let jwks_uri = match jwks_uri {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to resolve JWKS URI");
                return Err(e);
            }
        };

        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing securetoken JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_rsa_keys(jwks);

        if keys_by_kid.is_empty() {
            return Err(AuthError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Securetoken JWKS cache refreshed");
        Ok(())
    }

    async fn resolve_jwks_uri(&self, force_refresh: bool) -> Result<String, AuthError> {
        if !force_refresh {
            let cache = self.discovery_cache.read().await;
            if let Some(entry) = cache
                .as_ref()
                .filter(|entry| entry.expires_at > Instant::now())
            {
                return Ok(entry.jwks_uri.clone());
            }
        }

        let cached_jwks_uri = self
            .discovery_cache
            .read()
            .await
            .as_ref()
            .map(|entry| entry.jwks_uri.clone());

        let response = self.http_client.get(&self.discovery_url).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                let discovery: OpenIdConfig = resp
                    .json()
                    .await
                    .map_err(|e| AuthError::Transient(format!("invalid discovery JSON: {e}")))?;

                *self.discovery_cache.write().await = Some(DiscoveryCacheEntry {
                    jwks_uri: discovery.jwks_uri.clone(),
                    expires_at: Instant::now() + ttl,
                });

                Ok(discovery.jwks_uri)
            }
            Ok(resp) => {
                tracing::warn!(
                    status = %resp.status(),
                    "OpenID discovery returned non-success status; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "OpenID discovery request failed; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaimsExtra {
    sign_in_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    exp: usize,
    iat: Option<usize>,
    auth_time: Option<usize>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    firebase: Option<FirebaseClaimsExtra>,
}

fn usable_rsa_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }

        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }

        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

/// Extract the token from an `Authorization: Bearer` header.
pub fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = auth_header
        .ok_or_else(|| AuthError::Rejected("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AuthError::Rejected("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::Rejected("Authorization header must be Bearer token".to_string())
    })?;

    if token.is_empty() {
        return Err(AuthError::Rejected("Bearer token is empty".to_string()));
    }

    Ok(token)
}

fn validate_subject(sub: &str) -> Result<(), AuthError> {
    if sub.is_empty() {
        return Err(AuthError::Rejected("sub claim is empty".to_string()));
    }
    if sub.len() > MAX_UID_LEN {
        return Err(AuthError::Rejected(format!(
            "sub claim longer than {MAX_UID_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_not_future(claim: &str, value: Option<usize>) -> Result<(), AuthError> {
    let Some(value) = value else {
        return Err(AuthError::Rejected(format!("missing {claim} claim")));
    };

    if value as u64 > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(AuthError::Rejected(format!(
            "{claim} claim is in the future"
        )));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    let Some(cache_control) = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
    else {
        return fallback;
    };

    Duration::from_secs(cache_control)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
