// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup.

use std::env;
use std::str::FromStr;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cloud Firestore (or the emulator when FIRESTORE_EMULATOR_HOST is set)
    Firestore,
    /// Process-local store, for local runs without any GCP access
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORE_BACKEND",
                reason: format!("unknown backend '{other}' (expected firestore or memory)"),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Firebase / GCP project ID (Firestore project and ID token audience)
    pub firebase_project_id: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Gemini model used by both flows
    pub gemini_model: String,
    /// Gemini REST base URL
    pub gemini_base_url: String,
    /// Document store backend
    pub store_backend: StoreBackend,

    // --- Secrets ---
    /// Gemini API key
    pub gemini_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| env::var("GCP_PROJECT_ID"))
            .unwrap_or_else(|_| "local-dev".to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                reason: format!("'{raw}' is not a valid port"),
            })?,
            Err(_) => 8080,
        };

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        Ok(Self {
            firebase_project_id,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:9002".to_string()),
            port,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            store_backend,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GEMINI_API_KEY"))?,
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:9002".to_string(),
            port: 8080,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            store_backend: StoreBackend::Memory,
            gemini_api_key: "test_gemini_key".to_string(),
        }
    }

    /// Issuer every Firebase ID token for this project must carry.
    pub fn token_issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.firebase_project_id)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GEMINI_API_KEY", "  test_key\n");
        env::set_var("FIREBASE_PROJECT_ID", "reflect-test");
        env::set_var("STORE_BACKEND", "Memory");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gemini_api_key, "test_key");
        assert_eq!(config.firebase_project_id, "reflect-test");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.token_issuer(),
            "https://securetoken.google.com/reflect-test"
        );
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!(
            "firestore".parse::<StoreBackend>().unwrap(),
            StoreBackend::Firestore
        );
        assert!(matches!(
            "postgres".parse::<StoreBackend>(),
            Err(ConfigError::Invalid { var: "STORE_BACKEND", .. })
        ));
    }
}
