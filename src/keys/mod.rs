//! Key records and the patch-based mutation model.
//!
//! A key record is an immutable snapshot of everything the proxy knows about
//! one upstream credential. All changes flow through [`KeyPatch`] applied by
//! the pool; nothing else writes record fields. The raw secret is carried
//! only for the HTTP call site and is excluded from `Debug` output.

pub mod families;
pub mod pool;

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use families::ModelFamily;
pub use pool::KeyPool;

/// Content-derived key identity, safe to log.
///
/// Derived from the secret with SHA-256 and truncated to a short hex form;
/// the same secret always hashes to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyHash(String);

impl KeyHash {
    /// Hash a raw secret into its pool identity.
    pub fn of(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self(format!("goo-{}", &hex::encode(digest)[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One pooled upstream credential and everything the checker has learned
/// about it.
#[derive(Clone)]
pub struct KeyRecord {
    /// Stable identity used in logs and patches.
    pub hash: KeyHash,
    /// Raw secret. Read via [`KeyRecord::secret`] at the HTTP call site only.
    secret: String,
    /// Key is out of rotation. Retained, never deleted.
    pub disabled: bool,
    /// Key is permanently dead upstream. Implies `disabled`.
    pub revoked: bool,
    /// Completion time of the last check, `None` until first checked.
    pub last_checked: Option<DateTime<Utc>>,
    /// Capability families discovered for this credential.
    pub model_families: BTreeSet<ModelFamily>,
    /// Raw provider model identifiers visible to this credential.
    pub model_ids: BTreeSet<String>,
}

impl KeyRecord {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            hash: KeyHash::of(&secret),
            secret,
            disabled: false,
            revoked: false,
            last_checked: None,
            model_families: BTreeSet::new(),
            model_ids: BTreeSet::new(),
        }
    }

    /// The raw secret. Must never be logged.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When this key next comes due. Never-checked keys are due immediately.
    pub fn next_due(&self, recheck_period: Duration) -> DateTime<Utc> {
        match self.last_checked {
            Some(checked) => checked + chrono::Duration::seconds(recheck_period.as_secs() as i64),
            None => DateTime::<Utc>::MIN_UTC,
        }
    }

    /// How far past due this key is at `now`. Non-negative means due.
    pub fn overdue_by(&self, recheck_period: Duration, now: DateTime<Utc>) -> chrono::Duration {
        now - self.next_due(recheck_period)
    }

    pub fn is_due(&self, recheck_period: Duration, now: DateTime<Utc>) -> bool {
        self.overdue_by(recheck_period, now) >= chrono::Duration::zero()
    }

    /// Apply a patch. Sole mutation path, called by the pool under its
    /// write lock. Enforces the `revoked => disabled` invariant.
    pub(crate) fn apply(&mut self, patch: KeyPatch) {
        if let Some(disabled) = patch.disabled {
            self.disabled = disabled;
        }
        if let Some(revoked) = patch.revoked {
            self.revoked = revoked;
        }
        if let Some(last_checked) = patch.last_checked {
            self.last_checked = Some(last_checked);
        }
        if let Some(families) = patch.model_families {
            self.model_families = families;
        }
        if let Some(ids) = patch.model_ids {
            self.model_ids = ids;
        }
        if self.revoked {
            self.disabled = true;
        }
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("hash", &self.hash)
            .field("secret", &"<redacted>")
            .field("disabled", &self.disabled)
            .field("revoked", &self.revoked)
            .field("last_checked", &self.last_checked)
            .field("model_families", &self.model_families)
            .field("model_ids", &self.model_ids.len())
            .finish()
    }
}

/// Partial update applied atomically by the pool.
///
/// Any subset of the mutable fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct KeyPatch {
    pub disabled: Option<bool>,
    pub revoked: Option<bool>,
    pub last_checked: Option<DateTime<Utc>>,
    pub model_families: Option<BTreeSet<ModelFamily>>,
    pub model_ids: Option<BTreeSet<String>>,
}

impl KeyPatch {
    /// Permanently take the key out of rotation.
    pub fn retire(now: DateTime<Utc>) -> Self {
        Self {
            disabled: Some(true),
            revoked: Some(true),
            last_checked: Some(now),
            ..Default::default()
        }
    }

    /// Record a completed check at `t`.
    pub fn checked_at(t: DateTime<Utc>) -> Self {
        Self {
            last_checked: Some(t),
            ..Default::default()
        }
    }
}
