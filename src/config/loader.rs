//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages for
//! misconfiguration. Any error here is fatal at startup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load, override from the process environment and validate.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - An environment override is malformed
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
  validate_config(&config)?;

  info!(
    rpc = %config.ledger.rpc_url,
    program = %config.ledger.program_id,
    poll_interval_secs = config.oracle.poll_interval_secs,
    dry_run = config.oracle.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse TOML content into a config without validation.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Overwrite file values with environment variables where present.
///
/// `lookup` abstracts the environment so tests need not mutate it.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(url) = lookup("RPC_URL") {
    config.ledger.rpc_url = url;
  }
  if let Some(path) = lookup("KEYPAIR_PATH") {
    config.ledger.keypair_path = path;
  }
  if let Some(program_id) = lookup("PROGRAM_ID") {
    config.ledger.program_id = program_id;
  }
  if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
    config.github.token = Some(token);
  }
  if let Some(secs) = lookup("POLL_INTERVAL_SECS") {
    config.oracle.poll_interval_secs = secs
      .trim()
      .parse()
      .with_context(|| format!("POLL_INTERVAL_SECS is not a number: {secs}"))?;
  }
  Ok(())
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive intervals, timeouts and budgets
/// - Parseable program id and commitment level
/// - Non-empty endpoints
/// - Bounded GitHub retry budget
pub fn validate_config(config: &AppConfig) -> Result<()> {
  // Oracle loop validation
  anyhow::ensure!(
    config.oracle.poll_interval_secs > 0,
    "poll_interval_secs must be positive"
  );
  anyhow::ensure!(
    (1..=64).contains(&config.oracle.max_concurrent_markets),
    "max_concurrent_markets must be in [1, 64], got {}",
    config.oracle.max_concurrent_markets
  );

  // Ledger validation
  anyhow::ensure!(
    config.ledger.rpc_url.starts_with("http://")
      || config.ledger.rpc_url.starts_with("https://"),
    "RPC URL must be http(s), got {:?}",
    config.ledger.rpc_url
  );
  config.ledger.program_id()?;
  config.ledger.commitment()?;
  anyhow::ensure!(
    !config.ledger.keypair_path.is_empty(),
    "keypair_path must not be empty"
  );
  anyhow::ensure!(
    config.ledger.timeout_secs > 0,
    "ledger timeout_secs must be positive"
  );

  // GitHub validation
  anyhow::ensure!(
    !config.github.api_url.is_empty(),
    "GitHub API URL must not be empty"
  );
  anyhow::ensure!(
    config.github.requests_per_minute > 0,
    "requests_per_minute must be positive"
  );
  anyhow::ensure!(
    config.github.max_concurrent > 0,
    "github max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.github.timeout_secs > 0,
    "github timeout_secs must be positive"
  );
  anyhow::ensure!(
    config.github.max_retries <= 10,
    "github max_retries must be at most 10, got {}",
    config.github.max_retries
  );
  anyhow::ensure!(
    config.github.retry_base_delay_ms <= 60_000,
    "github retry_base_delay_ms must be at most 60000, got {}",
    config.github.retry_base_delay_ms
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.oracle.poll_interval_secs, 30);
    assert_eq!(config.ledger.rpc_url, "https://api.devnet.solana.com");
    assert!(config.github.token.is_none());
    validate_config(&config).unwrap();
  }

  #[test]
  fn test_file_values_are_parsed() {
    let config = parse_config(
      r#"
      [oracle]
      poll_interval_secs = 10
      dry_run = true

      [ledger]
      rpc_url = "http://127.0.0.1:8899"
      commitment = "finalized"

      [github]
      requests_per_minute = 120
      "#,
    )
    .unwrap();

    assert_eq!(config.oracle.poll_interval_secs, 10);
    assert!(config.oracle.dry_run);
    assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8899");
    assert_eq!(config.github.requests_per_minute, 120);
    assert_eq!(config.github.api_url, "https://api.github.com");
    validate_config(&config).unwrap();
  }

  #[test]
  fn test_env_overrides_win() {
    let mut config = parse_config("[ledger]\nrpc_url = \"http://file\"\n").unwrap();
    apply_env_overrides(
      &mut config,
      env(&[
        ("RPC_URL", "https://api.mainnet-beta.solana.com"),
        ("KEYPAIR_PATH", "/keys/oracle.json"),
        ("GITHUB_TOKEN", "ghp_secret"),
        ("POLL_INTERVAL_SECS", "15"),
      ]),
    )
    .unwrap();

    assert_eq!(config.ledger.rpc_url, "https://api.mainnet-beta.solana.com");
    assert_eq!(config.ledger.keypair_path, "/keys/oracle.json");
    assert_eq!(config.github.token.as_deref(), Some("ghp_secret"));
    assert_eq!(config.oracle.poll_interval_secs, 15);
  }

  #[test]
  fn test_malformed_poll_interval_is_fatal() {
    let mut config = AppConfig::default();
    let result = apply_env_overrides(&mut config, env(&[("POLL_INTERVAL_SECS", "soon")]));
    assert!(result.is_err());
  }

  #[test]
  fn test_validation_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.ledger.program_id = "not-a-pubkey".to_string();
    assert!(validate_config(&config).is_err());

    let mut config = AppConfig::default();
    config.ledger.commitment = "eventually".to_string();
    assert!(validate_config(&config).is_err());

    let mut config = AppConfig::default();
    config.oracle.poll_interval_secs = 0;
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_validation_bounds_github_retries() {
    let mut config = AppConfig::default();
    config.github.max_retries = 10;
    config.github.retry_base_delay_ms = 60_000;
    validate_config(&config).unwrap();

    config.github.max_retries = 40;
    assert!(validate_config(&config).is_err());

    let mut config = AppConfig::default();
    config.github.retry_base_delay_ms = u64::MAX;
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_keypair_path_expansion() {
    let config = AppConfig::default();
    assert_eq!(
      config.ledger.keypair_path(Some("/home/oracle")),
      Path::new("/home/oracle/.config/solana/id.json")
    );
    assert_eq!(
      config.ledger.keypair_path(None),
      Path::new("~/.config/solana/id.json")
    );
  }
}
