//! Configuration Module - TOML-based Oracle Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides (`RPC_URL`, `KEYPAIR_PATH`,
//! `GITHUB_TOKEN`, `POLL_INTERVAL_SECS`, `PROGRAM_ID`), optionally
//! sourced from a `.env` file. The program id, endpoints and key
//! location are externalized here - nothing is hardcoded in the
//! domain layer.

pub mod loader;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

/// Top-level oracle configuration.
///
/// Every section has defaults, so an empty file plus environment
/// variables is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Oracle identity and loop settings.
  #[serde(default)]
  pub oracle: OracleConfig,
  /// Solana RPC and signing key.
  #[serde(default)]
  pub ledger: LedgerConfig,
  /// GitHub REST API access.
  #[serde(default)]
  pub github: GithubConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Oracle identity and resolution loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
  /// Human-readable oracle name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Seconds between the start of consecutive cycles.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  /// Markets processed concurrently within one cycle.
  #[serde(default = "default_max_concurrent_markets")]
  pub max_concurrent_markets: usize,
  /// Decide outcomes but never submit transactions.
  #[serde(default)]
  pub dry_run: bool,
}

/// Ledger (Solana RPC) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
  /// JSON-RPC endpoint.
  #[serde(default = "default_rpc_url")]
  pub rpc_url: String,
  /// Base58 Ship or Slip program id.
  #[serde(default = "default_program_id")]
  pub program_id: String,
  /// solana-keygen JSON keypair file; `~/` expands to `$HOME`.
  #[serde(default = "default_keypair_path")]
  pub keypair_path: String,
  /// Commitment level: processed, confirmed or finalized.
  #[serde(default = "default_commitment")]
  pub commitment: String,
  /// RPC request timeout in seconds.
  #[serde(default = "default_rpc_timeout")]
  pub timeout_secs: u64,
}

/// GitHub REST API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
  /// API base URL.
  #[serde(default = "default_github_url")]
  pub api_url: String,
  /// Personal access token. Prefer the `GITHUB_TOKEN` env var.
  #[serde(default)]
  pub token: Option<String>,
  /// Request timeout in seconds.
  #[serde(default = "default_github_timeout")]
  pub timeout_secs: u64,
  /// Request budget per minute (unauthenticated GitHub allows 60/h).
  #[serde(default = "default_requests_per_minute")]
  pub requests_per_minute: u32,
  /// Maximum lookups in flight at once.
  #[serde(default = "default_github_concurrency")]
  pub max_concurrent: usize,
  /// Retries on 5xx responses before reporting "unknown".
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff), milliseconds.
  #[serde(default = "default_retry_delay")]
  pub retry_base_delay_ms: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl OracleConfig {
  /// Loop interval as a `Duration`.
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }
}

impl LedgerConfig {
  /// Parse the configured program id.
  pub fn program_id(&self) -> Result<Pubkey> {
    Pubkey::from_str(&self.program_id)
      .with_context(|| format!("Invalid program_id: {}", self.program_id))
  }

  /// Parse the configured commitment level.
  pub fn commitment(&self) -> Result<CommitmentConfig> {
    match self.commitment.as_str() {
      "processed" => Ok(CommitmentConfig::processed()),
      "confirmed" => Ok(CommitmentConfig::confirmed()),
      "finalized" => Ok(CommitmentConfig::finalized()),
      other => anyhow::bail!("Unknown commitment level: {other}"),
    }
  }

  /// Keypair path with a leading `~/` expanded against `home`.
  pub fn keypair_path(&self, home: Option<&str>) -> PathBuf {
    match (self.keypair_path.strip_prefix("~/"), home) {
      (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
      _ => PathBuf::from(&self.keypair_path),
    }
  }

  /// RPC timeout as a `Duration`.
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      poll_interval_secs: default_poll_interval(),
      max_concurrent_markets: default_max_concurrent_markets(),
      dry_run: false,
    }
  }
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      rpc_url: default_rpc_url(),
      program_id: default_program_id(),
      keypair_path: default_keypair_path(),
      commitment: default_commitment(),
      timeout_secs: default_rpc_timeout(),
    }
  }
}

impl Default for GithubConfig {
  fn default() -> Self {
    Self {
      api_url: default_github_url(),
      token: None,
      timeout_secs: default_github_timeout(),
      requests_per_minute: default_requests_per_minute(),
      max_concurrent: default_github_concurrency(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_delay(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "ship-or-slip-oracle".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_poll_interval() -> u64 {
  30
}

fn default_max_concurrent_markets() -> usize {
  4
}

fn default_rpc_url() -> String {
  "https://api.devnet.solana.com".to_string()
}

fn default_program_id() -> String {
  "HSkqo48KXh7xF7RLPCqQEtExBH6AqdU4rz6s2odFgYAi".to_string()
}

fn default_keypair_path() -> String {
  "~/.config/solana/id.json".to_string()
}

fn default_commitment() -> String {
  "confirmed".to_string()
}

fn default_rpc_timeout() -> u64 {
  30
}

fn default_github_url() -> String {
  "https://api.github.com".to_string()
}

fn default_github_timeout() -> u64 {
  10
}

fn default_requests_per_minute() -> u32 {
  30
}

fn default_github_concurrency() -> usize {
  4
}

fn default_max_retries() -> u32 {
  2
}

fn default_retry_delay() -> u64 {
  500
}

fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
