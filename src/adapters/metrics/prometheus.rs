//! Prometheus Metrics Registry - Oracle Observability
//!
//! Registers and exposes Prometheus metrics for the resolution loop:
//! cycle outcomes and latency, decode failures, resolutions by side,
//! ledger rejections, deferrals and PR lookups.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the oracle.
///
/// All metrics follow the naming convention `ship_or_slip_oracle_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed cycles by result (`ok`, `list_failed`).
    pub cycles: IntCounterVec,
    /// Cycle wall-clock duration in seconds.
    pub cycle_duration_secs: HistogramVec,
    /// Open markets seen by the last successful cycle.
    pub open_markets: IntGauge,
    /// Market accounts skipped because they failed to decode.
    pub decode_failures: IntCounter,
    /// Resolutions by winning side (`ship`, `slip`).
    pub resolutions: IntCounterVec,
    /// Resolutions refused by the ledger.
    pub rejections: IntCounter,
    /// Resolutions left for the next cycle after a transport failure.
    pub deferrals: IntCounter,
    /// PR status lookups.
    pub pr_lookups: IntCounter,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("ship_or_slip_oracle_cycles_total", "Resolution cycles run"),
            &["result"],
        )?;

        let cycle_duration_secs = HistogramVec::new(
            HistogramOpts::new(
                "ship_or_slip_oracle_cycle_duration_seconds",
                "Resolution cycle duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["result"],
        )?;

        let open_markets = IntGauge::new(
            "ship_or_slip_oracle_open_markets",
            "Open markets seen by the last successful cycle",
        )?;

        let decode_failures = IntCounter::new(
            "ship_or_slip_oracle_decode_failures_total",
            "Market accounts skipped as undecodable",
        )?;

        let resolutions = IntCounterVec::new(
            Opts::new(
                "ship_or_slip_oracle_resolutions_total",
                "Confirmed market resolutions",
            ),
            &["outcome"],
        )?;

        let rejections = IntCounter::new(
            "ship_or_slip_oracle_rejections_total",
            "Resolutions refused by the ledger",
        )?;

        let deferrals = IntCounter::new(
            "ship_or_slip_oracle_deferrals_total",
            "Resolutions deferred after a transport failure",
        )?;

        let pr_lookups = IntCounter::new(
            "ship_or_slip_oracle_pr_lookups_total",
            "Pull request status lookups",
        )?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycle_duration_secs.clone()))?;
        registry.register(Box::new(open_markets.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(resolutions.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(deferrals.clone()))?;
        registry.register(Box::new(pr_lookups.clone()))?;

        Ok(Self {
            registry,
            cycles,
            cycle_duration_secs,
            open_markets,
            decode_failures,
            resolutions,
            rejections,
            deferrals,
            pr_lookups,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
