//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export on :9090 and health check
//! endpoints (/live, /ready) via axum 0.7, both fed by the
//! resolution loop's per-cycle telemetry.

pub mod health;
pub mod prometheus;
pub mod telemetry;

pub use health::{HealthServer, HealthState};
pub use prometheus::MetricsRegistry;
pub use telemetry::Telemetry;
