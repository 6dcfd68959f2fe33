//! In-memory key pool.
//!
//! Holds all credential records and exposes `update` as the single write
//! path. Readers get cloned snapshots; due-time queries never hold the lock
//! across an await point.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{KeyHash, KeyPatch, KeyRecord};

/// Pool of upstream credentials.
pub struct KeyPool {
    keys: RwLock<HashMap<KeyHash, KeyRecord>>,
}

impl KeyPool {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Build a pool from raw secrets. Duplicate secrets collapse to one
    /// record (identity is content-derived).
    pub fn from_secrets<'a, I>(secrets: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pool = Self::new();
        for secret in secrets {
            pool.insert(KeyRecord::new(secret));
        }
        pool
    }

    pub fn insert(&self, record: KeyRecord) {
        let mut keys = self.keys.write().unwrap();
        keys.insert(record.hash.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of one record.
    pub fn get(&self, hash: &KeyHash) -> Option<KeyRecord> {
        self.keys.read().unwrap().get(hash).cloned()
    }

    /// Snapshot of every record.
    pub fn snapshot(&self) -> Vec<KeyRecord> {
        self.keys.read().unwrap().values().cloned().collect()
    }

    /// Apply a patch atomically. Returns false if the key is unknown.
    pub fn update(&self, hash: &KeyHash, patch: KeyPatch) -> bool {
        let mut keys = self.keys.write().unwrap();
        match keys.get_mut(hash) {
            Some(record) => {
                debug!(key = %hash, ?patch, "applying key patch");
                record.apply(patch);
                true
            }
            None => {
                debug!(key = %hash, "patch for unknown key dropped");
                false
            }
        }
    }

    /// Enabled keys currently due, most overdue first.
    pub fn due_keys(&self, recheck_period: Duration, now: DateTime<Utc>) -> Vec<KeyRecord> {
        let keys = self.keys.read().unwrap();
        let mut due: Vec<KeyRecord> = keys
            .values()
            .filter(|k| !k.disabled && k.is_due(recheck_period, now))
            .cloned()
            .collect();
        due.sort_by_key(|k| std::cmp::Reverse(k.overdue_by(recheck_period, now)));
        due
    }

    /// The single most-overdue due key, if any.
    pub fn most_overdue(&self, recheck_period: Duration, now: DateTime<Utc>) -> Option<KeyRecord> {
        self.due_keys(recheck_period, now).into_iter().next()
    }

    /// Earliest upcoming due time across enabled keys.
    pub fn next_due_at(&self, recheck_period: Duration) -> Option<DateTime<Utc>> {
        let keys = self.keys.read().unwrap();
        keys.values()
            .filter(|k| !k.disabled)
            .map(|k| k.next_due(recheck_period))
            .min()
    }
}

impl Default for KeyPool {
    fn default() -> Self {
        Self::new()
    }
}
