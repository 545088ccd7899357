//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The provider choice and its credential are
//! read exactly once here and injected into the orchestrator at construction
//! time; nothing reads them again afterward.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The AI provider selected for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderChoice {
    OpenAi,
    Gemini,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub ai_provider: ProviderChoice,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_url: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:thetamind.db".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load AI Provider Settings ---
        let ai_provider_str =
            std::env::var("AI_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let ai_provider = match ai_provider_str.to_lowercase().as_str() {
            "openai" => ProviderChoice::OpenAi,
            "gemini" => ProviderChoice::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "AI_PROVIDER".to_string(),
                    format!("'{}' is not a supported provider", other),
                ))
            }
        };

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4-turbo".to_string());
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        // Gemini is reached through its OpenAI-compatible endpoint, so one
        // adapter serves both providers.
        let gemini_api_base = std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });

        // --- Load Federated Login Settings (as optional) ---
        let google_client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
        let google_client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();
        let google_redirect_url = std::env::var("GOOGLE_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:8000/auth".to_string());

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            ai_provider,
            openai_api_key,
            gemini_api_key,
            openai_model,
            gemini_model,
            gemini_api_base,
            google_client_id,
            google_client_secret,
            google_redirect_url,
            cors_origin,
        })
    }
}
