//! Application Configuration Module
//!
//! Loads the agent's settings from the environment (and a `.env` file when
//! present) into one struct that `main` hands to the pieces it builds.

use secrecy::SecretString;
use std::env;
use std::time::Duration;
use tracing::Level;

/// Where the session record store listens when `MEDVOICE_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
/// Report generation limit when `REPORT_TIMEOUT_SECS` is unset.
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 120;

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub api_url: String,
    pub user_email: Option<String>,
    pub voice_api_key: Option<SecretString>,
    pub voice_base_url: Option<String>,
    pub assistant_id: Option<String>,
    pub report_timeout: Option<Duration>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `MEDVOICE_API_URL`: (Optional) Base URL of the session record store. Defaults to `http://127.0.0.1:3000`.
    /// *   `USER_EMAIL`: (Optional) Identifies the caller to the store.
    /// *   `VOICE_API_KEY`: Secret key for the voice service. Required for calls.
    /// *   `VOICE_ASSISTANT_ID`: The hosted assistant to call. Required for calls.
    /// *   `VOICE_BASE_URL`: (Optional) Websocket base URL of the voice service.
    /// *   `REPORT_TIMEOUT_SECS`: (Optional) Limit on report generation. Defaults to 120; `0` waits forever.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_url = env::var("MEDVOICE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let user_email = env::var("USER_EMAIL").ok().filter(|v| !v.trim().is_empty());

        let voice_api_key = env::var("VOICE_API_KEY").ok().map(SecretString::from);
        let voice_base_url = env::var("VOICE_BASE_URL").ok();
        let assistant_id = env::var("VOICE_ASSISTANT_ID").ok();

        let timeout_str = env::var("REPORT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REPORT_TIMEOUT_SECS.to_string());
        let timeout_secs = timeout_str.trim().parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("REPORT_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let report_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_url,
            user_email,
            voice_api_key,
            voice_base_url,
            assistant_id,
            report_timeout,
            log_level,
        })
    }

    /// Takes the voice credentials, which only the `call` command needs.
    pub fn take_voice_credentials(&mut self) -> Result<(SecretString, String), ConfigError> {
        let api_key = self
            .voice_api_key
            .take()
            .ok_or_else(|| ConfigError::MissingVar("VOICE_API_KEY".to_string()))?;
        let assistant_id = self
            .assistant_id
            .take()
            .ok_or_else(|| ConfigError::MissingVar("VOICE_ASSISTANT_ID".to_string()))?;
        Ok((api_key, assistant_id))
    }
}
