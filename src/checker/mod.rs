//! Recurring key health checks.
//!
//! The scheduler owns pacing and sequencing; what a check actually does is
//! provider-specific and injected through [`KeyChecker`]. Exactly one probe
//! is in flight at any time: provider rate limits are per-account rather
//! than per-process, so serializing bounds worst-case burst load no matter
//! how many keys the pool holds.

pub mod gemini;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::CheckError;
use crate::keys::{KeyPatch, KeyPool, KeyRecord};

/// Provider-specific probe and failure policy.
///
/// Both hooks report their outcome to the pool themselves through `update`;
/// the scheduler never inspects key state or error contents.
#[async_trait]
pub trait KeyChecker: Send + Sync + 'static {
    /// Probe one key. On success the implementation has already patched the
    /// record with fresh capability data and a refreshed check time.
    async fn check_key(&self, key: &KeyRecord) -> Result<(), CheckError>;

    /// Classify a probe failure and apply the resulting policy update
    /// (retire, reschedule, or log only). An error escaping this hook is
    /// caught at the loop boundary; the key falls back to its normal period.
    async fn handle_failure(&self, key: &KeyRecord, error: CheckError) -> anyhow::Result<()>;
}

/// Scheduler pacing configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum gap between any two consecutive checks, across all keys.
    pub min_check_interval: Duration,
    /// How often each individual key is re-probed.
    pub recheck_period: Duration,
    /// Keep running after the initial pass. When false, the scheduler
    /// checks the keys due right now once and returns.
    pub recurring: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_check_interval: Duration::from_secs(15),
            recheck_period: Duration::from_secs(6 * 3600),
            recurring: true,
        }
    }
}

/// Drives recurring health checks over the pool, strictly one at a time.
pub struct CheckScheduler<C> {
    pool: Arc<KeyPool>,
    checker: C,
    config: SchedulerConfig,
}

impl<C: KeyChecker> CheckScheduler<C> {
    pub fn new(pool: Arc<KeyPool>, checker: C, config: SchedulerConfig) -> Self {
        Self {
            pool,
            checker,
            config,
        }
    }

    /// Run the scheduler on the current task until it finishes (one-shot
    /// mode) or forever (recurring mode).
    pub async fn run(self) {
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.run_until(&mut shutdown_rx).await;
    }

    /// Start the scheduler as a background task.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run_until(&mut shutdown_rx).await;
        });
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run_until(&self, shutdown: &mut watch::Receiver<bool>) {
        info!(
            keys = self.pool.len(),
            recurring = self.config.recurring,
            recheck_period_secs = self.config.recheck_period.as_secs(),
            "key check scheduler started"
        );
        if self.config.recurring {
            self.run_recurring(shutdown).await;
        } else {
            self.run_once(shutdown).await;
        }
        info!("key check scheduler finished");
    }

    /// One pass over the keys due at pass start.
    async fn run_once(&self, shutdown: &mut watch::Receiver<bool>) {
        let due = self.pool.due_keys(self.config.recheck_period, Utc::now());
        info!(due = due.len(), "running one-shot check pass");

        let mut first = true;
        for key in due {
            if *shutdown.borrow() {
                break;
            }
            if !first {
                self.pace(self.config.min_check_interval, shutdown).await;
            }
            first = false;
            self.check_one(&key).await;
        }
    }

    async fn run_recurring(&self, shutdown: &mut watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Utc::now();
            match self.pool.most_overdue(self.config.recheck_period, now) {
                Some(key) => {
                    self.check_one(&key).await;
                    self.pace(self.config.min_check_interval, shutdown).await;
                }
                None => {
                    let wait = self.idle_wait();
                    debug!(wait_secs = wait.as_secs(), "no key due, sleeping");
                    self.pace(wait, shutdown).await;
                }
            }
        }
    }

    /// Check a single key. Nothing thrown by the checker may stop the loop.
    async fn check_one(&self, key: &KeyRecord) {
        debug!(key = %key.hash, "checking key");
        if let Err(check_error) = self.checker.check_key(key).await {
            if let Err(policy_error) = self.checker.handle_failure(key, check_error).await {
                // The failure handler itself failed. Stamp the check so the
                // key retries at its normal period instead of being
                // re-picked immediately.
                error!(
                    key = %key.hash,
                    error = %policy_error,
                    "failure handler errored; key retried at normal period"
                );
                self.pool.update(&key.hash, KeyPatch::checked_at(Utc::now()));
            }
        }
    }

    /// Sleep for `duration`, waking early on shutdown.
    async fn pace(&self, duration: Duration, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown_changed(shutdown) => {}
        }
    }

    /// How long to sleep when nothing is due: until the soonest due time,
    /// floored at one second so a racing clock cannot busy-loop.
    fn idle_wait(&self) -> Duration {
        match self.pool.next_due_at(self.config.recheck_period) {
            Some(due) => (due - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(Duration::from_secs(1)),
            None => self.config.min_check_interval.max(Duration::from_secs(1)),
        }
    }
}

/// Waits for a shutdown signal; pends forever if the sender is gone so a
/// detached `run()` never sees a spurious wake-up.
async fn shutdown_changed(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Handle for a scheduler running in the background.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop and wait for it to wind down. An
    /// in-flight check runs to completion first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
