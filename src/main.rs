//! Ship or Slip Oracle - Entry Point
//!
//! Initializes configuration, logging, the Solana ledger gateway and
//! the GitHub status client, then runs the resolution loop until
//! SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load .env, then config.toml (path from ORACLE_CONFIG) + env overrides
//! 2. Init tracing (JSON structured logging)
//! 3. Load the oracle keypair (KEYPAIR_PATH)
//! 4. Connect the Solana ledger gateway (implements Ledger port)
//! 5. Create the GitHub client (implements PrStatusSource port)
//! 6. Spawn Prometheus metrics on :9090 and health probes on :8080
//! 7. Spawn the resolution loop (fixed interval, no overlapping cycles)
//! 8. Wait for SIGINT/SIGTERM → broadcast shutdown → bounded join

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use solana_sdk::signature::Signer;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use ship_or_slip_oracle::adapters::github::{GithubClient, GithubClientConfig};
use ship_or_slip_oracle::adapters::metrics::{HealthServer, HealthState, MetricsRegistry, Telemetry};
use ship_or_slip_oracle::adapters::solana::{SolanaLedger, load_keypair};
use ship_or_slip_oracle::config;
use ship_or_slip_oracle::ports::ledger::Ledger;
use ship_or_slip_oracle::usecases::resolver::{CycleObserver, OracleContext, Resolver};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let _ = dotenvy::dotenv();
    let config_path = std::env::var("ORACLE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.oracle.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.oracle.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.oracle.dry_run,
        rpc = %config.ledger.rpc_url,
        "Starting Ship or Slip oracle"
    );

    // ── 3. Load the oracle keypair ──────────────────────────
    let home = std::env::var("HOME").ok();
    let keypair_path = config.ledger.keypair_path(home.as_deref());
    let payer = Arc::new(load_keypair(&keypair_path)?);
    info!(oracle = %payer.pubkey(), "Oracle keypair loaded");

    // ── 4. Connect the ledger gateway ───────────────────────
    let ledger = Arc::new(
        SolanaLedger::connect(&config.ledger, Arc::clone(&payer))
            .await
            .context("Failed to connect ledger gateway")?,
    );

    // ── 5. Create the GitHub status client ──────────────────
    if config.github.token.is_none() {
        warn!("GITHUB_TOKEN not set, using unauthenticated GitHub rate limits");
    }
    let github = Arc::new(
        GithubClient::new(GithubClientConfig::from(&config.github))
            .context("Failed to create GitHub client")?,
    );

    // ── 6. Shutdown channel, metrics and health ─────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health = Arc::new(HealthState::new());

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let observer: Arc<dyn CycleObserver> = Arc::new(Telemetry::new(Arc::clone(&metrics), Arc::clone(&health)));

    let metrics_handle = if config.metrics.enabled {
        let metrics_shutdown = shutdown_tx.subscribe();
        let bind_address = config.metrics.bind_address.clone();
        let metrics_ref = Arc::clone(&metrics);
        Some(tokio::spawn(async move {
            if let Err(e) = metrics_ref.serve(bind_address, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    let health_shutdown = shutdown_tx.subscribe();
    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    // ── 7. Spawn the resolution loop ────────────────────────
    let ctx = OracleContext::from_config(&config.oracle, config.ledger.program_id()?, ledger.signer());
    let resolver = Resolver::new(Arc::clone(&ledger), github, ctx).with_observer(observer);
    let interval = config.oracle.poll_interval();
    let resolver_shutdown = shutdown_tx.subscribe();
    let resolver_handle = tokio::spawn(async move {
        resolver.run(interval, resolver_shutdown).await;
    });

    info!("All tasks spawned, oracle is running");

    // ── 8. Wait for SIGINT or SIGTERM ───────────────────────
    wait_for_signal().await?;

    health.mark_shutting_down();
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // In-flight cycle gets 30s to finish confirming
    if tokio::time::timeout(Duration::from_secs(30), resolver_handle)
        .await
        .is_err()
    {
        warn!("Resolution loop did not stop in time, abandoning in-flight cycle");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve on the first of SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    let mut sigterm = unix_signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("Failed to listen for SIGINT")?;
            info!("SIGINT received, initiating graceful shutdown");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, initiating graceful shutdown");
        }
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");
    Ok(())
}
