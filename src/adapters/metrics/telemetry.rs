//! Cycle telemetry: feeds each resolution cycle into the Prometheus
//! registry and the readiness probe.

use std::sync::Arc;
use std::time::Duration;

use super::health::HealthState;
use super::prometheus::MetricsRegistry;
use crate::domain::market::Side;
use crate::ports::ledger::LedgerError;
use crate::usecases::resolver::{CycleObserver, CycleReport, MarketDisposition};

/// `CycleObserver` recording metrics and health.
pub struct Telemetry {
    metrics: Arc<MetricsRegistry>,
    health: Arc<HealthState>,
}

impl Telemetry {
    pub fn new(metrics: Arc<MetricsRegistry>, health: Arc<HealthState>) -> Self {
        Self { metrics, health }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn as_i64(n: usize) -> i64 {
    n as i64
}

impl CycleObserver for Telemetry {
    fn on_cycle(&self, result: &Result<CycleReport, LedgerError>, elapsed: Duration) {
        let label = if result.is_ok() { "ok" } else { "list_failed" };
        self.metrics.cycles.with_label_values(&[label]).inc();
        self.metrics
            .cycle_duration_secs
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());
        self.health.record_cycle(result.is_ok());

        let Ok(report) = result else {
            return;
        };

        let tally = report.tally();
        self.metrics.open_markets.set(as_i64(report.open));
        self.metrics.decode_failures.inc_by(report.undecodable as u64);
        self.metrics.pr_lookups.inc_by(tally.lookups() as u64);
        self.metrics.rejections.inc_by(tally.already_settled as u64);
        self.metrics.deferrals.inc_by(tally.deferred as u64);

        for result in &report.results {
            if let MarketDisposition::Resolved { side, .. } = result.disposition {
                let outcome = match side {
                    Side::Ship => "ship",
                    Side::Slip => "slip",
                };
                self.metrics.resolutions.with_label_values(&[outcome]).inc();
            }
        }
    }
}
