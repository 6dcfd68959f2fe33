//! Palisade key checker entry point.
//!
//! Validates the configured Gemini key pool: a single pass over due keys by
//! default, or a long-running recurring checker with CHECK_RECURRING=1.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

use palisade::{
    CheckScheduler, Config, GeminiClient, GeminiKeyChecker, KeyPool, SchedulerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palisade=info".into()),
        )
        .with_target(true)
        .init();

    info!("Starting Palisade key checker");

    // Load configuration
    let config = Config::from_env()?;
    info!(keys = config.gemini_api_keys.len(), "Configuration loaded");

    // Initialize HTTP client; its timeout is the only bound on a stuck check
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    // Seed the pool and wire up the checker
    let pool = Arc::new(KeyPool::from_secrets(
        config.gemini_api_keys.iter().map(String::as_str),
    ));
    let client = GeminiClient::new(http_client, config.gemini_api_url.clone());
    let checker = GeminiKeyChecker::new(
        pool.clone(),
        client,
        config.reference_model.clone(),
        config.recheck_period(),
    );
    let scheduler = CheckScheduler::new(
        pool.clone(),
        checker,
        SchedulerConfig {
            min_check_interval: config.min_check_interval(),
            recheck_period: config.recheck_period(),
            recurring: config.check_recurring,
        },
    );

    if config.check_recurring {
        let handle = scheduler.spawn();
        shutdown_signal().await;
        handle.stop().await;
    } else {
        scheduler.run().await;
    }

    // Final per-key summary
    for key in pool.snapshot() {
        info!(
            key = %key.hash,
            disabled = key.disabled,
            revoked = key.revoked,
            families = ?key.model_families,
            model_count = key.model_ids.len(),
            "key status"
        );
    }

    info!("Palisade key checker finished");
    Ok(())
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating shutdown");
        }
    }
}
