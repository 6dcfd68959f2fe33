//! Gemini key checker.
//!
//! Probes a credential in two steps: capability discovery through the model
//! listing, then a live-inference smoke test. Listing models can succeed for
//! credentials that cannot actually generate (billing never enabled), so
//! only a real generation call proves the key is usable.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::checker::KeyChecker;
use crate::error::CheckError;
use crate::gemini::{summarize_error_body, GeminiClient};
use crate::keys::{families, KeyPatch, KeyPool, KeyRecord, ModelFamily};

/// Model used for the smoke test: the cheapest generation-capable model.
pub const DEFAULT_REFERENCE_MODEL: &str = "gemini-2.0-flash-lite";

/// Delay before retrying a key that hit a generic rate limit.
const RATE_LIMIT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delay before retrying a key after a failure with no response.
const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(10);

/// 400-level error text that marks a key as permanently dead.
static DEAD_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)please enable billing|api key not valid|api key expired|api_key_invalid|invalid api key format",
    )
    .expect("dead key pattern must compile")
});

/// 429 error text that means the key has no quota at all, as opposed to a
/// momentary limit.
static ZERO_QUOTA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""quota_limit_value"\s*:\s*"0"|GenerateRequestsPerMinutePerProjectPerModel-FreeTier"#,
    )
    .expect("zero quota pattern must compile")
});

/// What the policy table decided for one failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Disable and revoke permanently.
    Retire(RetireReason),
    /// Keep the key enabled, re-check after this delay.
    RetryAfter(Duration),
    /// Unexpected status: leave the key on its normal schedule.
    RetryAtNormalPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    InvalidKey,
    Unauthorized,
    QuotaExhausted,
}

impl RetireReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetireReason::InvalidKey => "invalid_key",
            RetireReason::Unauthorized => "unauthorized",
            RetireReason::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// Classify an HTTP failure into a key action.
///
/// Pure function of the status code and response body text; classifying the
/// same payload twice always yields the same action.
pub fn classify_http_failure(status: u16, body: &str) -> KeyAction {
    match status {
        400 if DEAD_KEY_PATTERN.is_match(body) => KeyAction::Retire(RetireReason::InvalidKey),
        401 | 403 => KeyAction::Retire(RetireReason::Unauthorized),
        429 if ZERO_QUOTA_PATTERN.is_match(body) => {
            KeyAction::Retire(RetireReason::QuotaExhausted)
        }
        429 => KeyAction::RetryAfter(RATE_LIMIT_RETRY_DELAY),
        _ => KeyAction::RetryAtNormalPeriod,
    }
}

/// Key checker for the Gemini API.
pub struct GeminiKeyChecker {
    pool: Arc<KeyPool>,
    client: GeminiClient,
    reference_model: String,
    recheck_period: Duration,
}

impl GeminiKeyChecker {
    pub fn new(
        pool: Arc<KeyPool>,
        client: GeminiClient,
        reference_model: impl Into<String>,
        recheck_period: Duration,
    ) -> Self {
        Self {
            pool,
            client,
            reference_model: reference_model.into(),
            recheck_period,
        }
    }

    /// Reschedule a key to come due `delay` from now by backdating
    /// `last_checked`, reusing the normal due-time computation instead of a
    /// second scheduling mechanism.
    fn reschedule(&self, key: &KeyRecord, delay: Duration) {
        let backdated = Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64)
            - chrono::Duration::seconds(self.recheck_period.as_secs() as i64);
        self.pool.update(&key.hash, KeyPatch::checked_at(backdated));
    }
}

#[async_trait]
impl KeyChecker for GeminiKeyChecker {
    async fn check_key(&self, key: &KeyRecord) -> Result<(), CheckError> {
        // Step 1: capability discovery. Patched before the smoke test so
        // the capability data survives a step-2 failure.
        let models = self.client.list_models(key.secret()).await?;

        let mut model_ids = BTreeSet::new();
        let mut model_families: BTreeSet<ModelFamily> = BTreeSet::new();
        for model in models.iter().filter(|m| m.supports_generation()) {
            let id = model.short_id().to_string();
            if let Some(family) = families::classify_model(&id) {
                model_families.insert(family);
            }
            model_ids.insert(id);
        }
        self.pool.update(
            &key.hash,
            KeyPatch {
                model_families: Some(model_families.clone()),
                model_ids: Some(model_ids.clone()),
                ..Default::default()
            },
        );
        debug!(
            key = %key.hash,
            models = model_ids.len(),
            "capability discovery complete"
        );

        // Step 2: live-inference smoke test against the reference model.
        self.client
            .smoke_generate(key.secret(), &self.reference_model)
            .await?;

        self.pool.update(
            &key.hash,
            KeyPatch {
                model_families: Some(model_families.clone()),
                last_checked: Some(Utc::now()),
                ..Default::default()
            },
        );
        info!(
            key = %key.hash,
            families = ?model_families,
            model_count = model_ids.len(),
            "key check passed"
        );
        Ok(())
    }

    async fn handle_failure(&self, key: &KeyRecord, error: CheckError) -> anyhow::Result<()> {
        match &error {
            CheckError::UpstreamStatus { status, body } => {
                match classify_http_failure(*status, body) {
                    KeyAction::Retire(reason) => {
                        warn!(
                            key = %key.hash,
                            status,
                            reason = reason.as_str(),
                            "retiring key permanently"
                        );
                        self.pool.update(&key.hash, KeyPatch::retire(Utc::now()));
                    }
                    KeyAction::RetryAfter(delay) => {
                        warn!(
                            key = %key.hash,
                            status,
                            retry_secs = delay.as_secs(),
                            "key rate limited, rescheduling"
                        );
                        self.reschedule(key, delay);
                    }
                    KeyAction::RetryAtNormalPeriod => {
                        // Likely an upstream API change; an operator should
                        // look at this. The key itself is treated as alive.
                        error!(
                            key = %key.hash,
                            status,
                            detail = %summarize_error_body(body),
                            "unexpected upstream status during key check"
                        );
                        self.pool.update(&key.hash, KeyPatch::checked_at(Utc::now()));
                    }
                }
            }
            // No response received; retry quickly.
            CheckError::Network(source) => {
                error!(key = %key.hash, error = %source, "network error during key check");
                self.reschedule(key, NETWORK_RETRY_DELAY);
            }
            CheckError::Malformed(source) => {
                error!(key = %key.hash, error = %source, "malformed response during key check");
                self.reschedule(key, NETWORK_RETRY_DELAY);
            }
        }
        Ok(())
    }
}
