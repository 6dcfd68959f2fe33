//! Configuration management for Palisade
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::checker::gemini::DEFAULT_REFERENCE_MODEL;
use crate::gemini::DEFAULT_API_BASE;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API base URL
    pub gemini_api_url: String,
    /// Model used for the live-inference smoke test
    pub reference_model: String,
    /// Upstream credentials, comma-separated in GEMINI_API_KEYS
    pub gemini_api_keys: Vec<String>,

    /// Per-key recheck period (in seconds)
    pub key_recheck_period_secs: u64,
    /// Minimum gap between any two consecutive checks (in seconds)
    pub min_check_interval_secs: u64,
    /// Keep re-checking after the initial pass
    pub check_recurring: bool,

    /// HTTP client timeout (in seconds)
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let keys_raw = env::var("GEMINI_API_KEYS").context("GEMINI_API_KEYS must be set")?;
        let gemini_api_keys: Vec<String> = keys_raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            gemini_api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            reference_model: env::var("GEMINI_REFERENCE_MODEL")
                .unwrap_or_else(|_| DEFAULT_REFERENCE_MODEL.to_string()),
            gemini_api_keys,

            key_recheck_period_secs: env::var("KEY_RECHECK_PERIOD_SECS")
                .unwrap_or_else(|_| "21600".to_string())
                .parse()
                .context("Invalid KEY_RECHECK_PERIOD_SECS")?,
            min_check_interval_secs: env::var("MIN_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("Invalid MIN_CHECK_INTERVAL_SECS")?,
            check_recurring: env::var("CHECK_RECURRING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid HTTP_TIMEOUT_SECS")?,
        })
    }

    pub fn recheck_period(&self) -> Duration {
        Duration::from_secs(self.key_recheck_period_secs)
    }

    pub fn min_check_interval(&self) -> Duration {
        Duration::from_secs(self.min_check_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // Set required env vars
        env::set_var("GEMINI_API_KEYS", "AIzaOne, AIzaTwo,,");

        let config = Config::from_env().unwrap();

        assert_eq!(config.gemini_api_url, DEFAULT_API_BASE);
        assert_eq!(config.reference_model, DEFAULT_REFERENCE_MODEL);
        assert_eq!(config.gemini_api_keys, vec!["AIzaOne", "AIzaTwo"]);
        assert_eq!(config.key_recheck_period_secs, 21600);
        assert_eq!(config.min_check_interval_secs, 15);
        assert!(!config.check_recurring);
        assert_eq!(config.http_timeout_secs, 30);

        // Clean up
        env::remove_var("GEMINI_API_KEYS");
    }
}
