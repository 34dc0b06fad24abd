//! Application settings
//!
//! Loads configuration from environment variables (plus an optional .env
//! file) with sensible defaults. API key values are configuration inputs;
//! they are wrapped so they never serialize or appear in debug output.

use crate::keypool::KeyCredential;
use crate::secret::Secret;
use crate::services::GeneratorConfig;
use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use std::time::Duration;

/// One configured API key: label for diagnostics plus the secret value.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyEntry {
    pub label: String,
    #[serde(skip)]
    pub key: Secret<String>,
}

/// Main application settings.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub app_name: String,
    pub log_level: String,

    /// Fixed credential list for the key pool
    pub api_keys: Vec<ApiKeyEntry>,

    /// Optional Gemini base URL override
    pub gemini_base_url: Option<String>,
    pub default_model: String,

    /// Cooldown for rate-limited keys, in minutes
    pub cooldown_minutes: u64,
    /// Randomized backoff bounds after a rate-limit rotation, in seconds
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,

    /// Retry budget per generate call (attempts = max_retries + 1)
    pub max_retries: u32,
    /// Wall-clock bound per attempt, in seconds
    pub timeout_seconds: u64,
}

impl Settings {
    /// Load settings from environment variables with defaults.
    ///
    /// Keys come from `GEMINI_API_KEYS` as a comma-separated list of
    /// `label:key` entries (bare keys get generated labels), falling back
    /// to a single `GEMINI_API_KEY`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_keys = match env::var("GEMINI_API_KEYS") {
            Ok(raw) => parse_api_keys(&raw),
            Err(_) => env::var("GEMINI_API_KEY")
                .ok()
                .map(|key| {
                    vec![ApiKeyEntry {
                        label: "key_1".to_string(),
                        key: key.into(),
                    }]
                })
                .unwrap_or_default(),
        };
        anyhow::ensure!(
            !api_keys.is_empty(),
            "no API keys configured; set GEMINI_API_KEYS or GEMINI_API_KEY"
        );

        Ok(Self {
            app_name: env_or_default("APP_NAME", "fabula"),
            log_level: env_or_default("LOG_LEVEL", "info"),
            api_keys,
            gemini_base_url: env::var("GEMINI_BASE_URL").ok(),
            default_model: env_or_default("GEMINI_MODEL", "gemini-2.0-flash"),
            cooldown_minutes: env_or_default("KEY_COOLDOWN_MINUTES", "60")
                .parse()
                .context("invalid KEY_COOLDOWN_MINUTES value")?,
            backoff_min_secs: env_or_default("BACKOFF_MIN_SECS", "1")
                .parse()
                .context("invalid BACKOFF_MIN_SECS value")?,
            backoff_max_secs: env_or_default("BACKOFF_MAX_SECS", "3")
                .parse()
                .context("invalid BACKOFF_MAX_SECS value")?,
            max_retries: env_or_default("MAX_RETRIES", "3")
                .parse()
                .context("invalid MAX_RETRIES value")?,
            timeout_seconds: env_or_default("ATTEMPT_TIMEOUT_SECS", "30")
                .parse()
                .context("invalid ATTEMPT_TIMEOUT_SECS value")?,
        })
    }

    /// Credentials for constructing the key pool.
    pub fn credentials(&self) -> Vec<KeyCredential> {
        self.api_keys
            .iter()
            .map(|entry| KeyCredential::new(entry.key.clone(), entry.label.clone()))
            .collect()
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_cooldown(Duration::from_secs(self.cooldown_minutes * 60))
            .with_backoff(
                Duration::from_secs(self.backoff_min_secs),
                Duration::from_secs(self.backoff_max_secs),
            )
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a comma-separated key list. Each entry is `label:key` or a bare
/// key, which gets a positional `key_N` label.
fn parse_api_keys(raw: &str) -> Vec<ApiKeyEntry> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(idx, entry)| match entry.split_once(':') {
            Some((label, key)) => ApiKeyEntry {
                label: label.trim().to_string(),
                key: key.trim().into(),
            },
            None => ApiKeyEntry {
                label: format!("key_{}", idx + 1),
                key: entry.into(),
            },
        })
        .collect()
}
