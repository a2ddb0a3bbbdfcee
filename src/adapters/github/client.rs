//! GitHub HTTP Client - Rate-limited Pull Request Lookups
//!
//! Wraps reqwest with a request quota, an in-flight cap and retries
//! for `GET /repos/{owner}/{repo}/pulls/{number}`. Implements the
//! `PrStatusSource` port: every failure collapses to `None` so that
//! an undeterminable PR defers its market instead of resolving it.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::types::{PullResponse, RateLimitInfo};
use crate::config::GithubConfig;
use crate::domain::market::RepoSlug;
use crate::domain::pull_request::PullRequest;
use crate::ports::pr_status::PrStatusSource;

/// Upper bound on a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff before retry `attempt` (1-based), capped at
/// `MAX_BACKOFF`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  let factor = 2u32
    .checked_pow(attempt.saturating_sub(1))
    .unwrap_or(u32::MAX);
  base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Configuration for the GitHub HTTP client.
#[derive(Debug, Clone)]
pub struct GithubClientConfig {
  /// Base URL for the REST API.
  pub base_url: String,
  /// Optional bearer token.
  pub token: Option<String>,
  /// Request timeout.
  pub timeout: Duration,
  /// Requests allowed per minute.
  pub requests_per_minute: u32,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for GithubClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.github.com".to_string(),
      token: None,
      timeout: Duration::from_secs(10),
      requests_per_minute: 30,
      max_concurrent: 4,
      max_retries: 2,
      retry_base_delay: Duration::from_millis(500),
    }
  }
}

impl From<&GithubConfig> for GithubClientConfig {
  fn from(config: &GithubConfig) -> Self {
    Self {
      base_url: config.api_url.trim_end_matches('/').to_string(),
      token: config.token.clone(),
      timeout: Duration::from_secs(config.timeout_secs),
      requests_per_minute: config.requests_per_minute,
      max_concurrent: config.max_concurrent,
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
    }
  }
}

/// Why a lookup produced no status.
#[derive(Debug, Error)]
pub enum LookupError {
  #[error("invalid repository: {0}")]
  InvalidRepo(String),
  #[error("pull request not found")]
  NotFound,
  #[error("rate limited by GitHub")]
  RateLimited,
  #[error("GitHub API error {0}")]
  Status(StatusCode),
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("malformed response: {0}")]
  Malformed(String),
}

/// Rate-limited HTTP client for the GitHub REST API.
pub struct GithubClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: GithubClientConfig,
  /// Request quota.
  limiter: DefaultDirectRateLimiter,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Last known rate limit info.
  last_rate_limit: RwLock<Option<RateLimitInfo>>,
}

impl GithubClient {
  /// Create a new GitHub client.
  pub fn new(config: GithubClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("ship-or-slip-oracle/", env!("CARGO_PKG_VERSION")))
      .pool_max_idle_per_host(4)
      .build()
      .context("Failed to build HTTP client")?;

    let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    Ok(Self {
      http,
      config,
      limiter,
      semaphore,
      last_rate_limit: RwLock::new(None),
    })
  }

  /// Fetch a pull request, reporting why when it can't be determined.
  #[instrument(skip(self))]
  pub async fn fetch(&self, repo: &str, number: u64) -> Result<PullRequest, LookupError> {
    let slug: RepoSlug = repo
      .parse()
      .map_err(|_| LookupError::InvalidRepo(repo.to_string()))?;
    let url = format!(
      "{}/repos/{}/{}/pulls/{number}",
      self.config.base_url, slug.owner, slug.name
    );

    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| LookupError::Malformed("semaphore closed".to_string()))?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let mut request = self
        .http
        .get(&url)
        .header(ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28");
      if let Some(token) = &self.config.token {
        request = request.bearer_auth(token);
      }

      let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = Some(LookupError::Transport(e));
          continue;
        }
      };

      let rate_limit = Self::parse_rate_limit(response.headers());
      if let Some(info) = &rate_limit {
        *self.last_rate_limit.write().await = Some(info.clone());
      }

      match response.status() {
        StatusCode::OK => {
          let body: PullResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;
          return Ok(body.into());
        }
        StatusCode::NOT_FOUND => return Err(LookupError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
        StatusCode::FORBIDDEN if rate_limit.as_ref().is_some_and(|r| r.remaining == 0) => {
          return Err(LookupError::RateLimited);
        }
        status if status.is_server_error() => {
          warn!(status = %status, "Server error, retrying");
          last_error = Some(LookupError::Status(status));
        }
        status => return Err(LookupError::Status(status)),
      }
    }

    Err(last_error.unwrap_or(LookupError::Malformed("max retries exceeded".to_string())))
  }

  /// Extract rate limit info from response headers.
  fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let get = |name: &str| {
      headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    };

    let remaining = get("x-ratelimit-remaining")?;
    Some(RateLimitInfo {
      remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
      reset_epoch_secs: get("x-ratelimit-reset").unwrap_or(0),
      limit: get("x-ratelimit-limit")
        .and_then(|l| u32::try_from(l).ok())
        .unwrap_or(0),
    })
  }

  /// Get the last known rate limit status.
  pub async fn rate_limit_status(&self) -> Option<RateLimitInfo> {
    self.last_rate_limit.read().await.clone()
  }
}

#[async_trait]
impl PrStatusSource for GithubClient {
  async fn pull_request(&self, repo: &str, number: u64) -> Option<PullRequest> {
    match self.fetch(repo, number).await {
      Ok(pr) => {
        debug!(repo, pr = number, state = ?pr.state, "Fetched PR status");
        Some(pr)
      }
      Err(LookupError::NotFound) => {
        info!(repo, pr = number, "PR not found, status unknown");
        None
      }
      Err(e) => {
        warn!(repo, pr = number, error = %e, "PR status unavailable");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use reqwest::header::HeaderValue;

  use super::*;

  #[test]
  fn test_config_from_app_config_trims_slash() {
    let app = GithubConfig {
      api_url: "https://ghe.example.com/api/v3/".to_string(),
      ..GithubConfig::default()
    };
    let config = GithubClientConfig::from(&app);
    assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
  }

  #[test]
  fn test_parse_rate_limit_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
    headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));

    let info = GithubClient::parse_rate_limit(&headers).unwrap();
    assert_eq!(info.remaining, 0);
    assert_eq!(info.reset_epoch_secs, 1_700_000_000);
    assert_eq!(info.limit, 60);

    assert!(GithubClient::parse_rate_limit(&HeaderMap::new()).is_none());
  }

  #[test]
  fn test_backoff_doubles_then_caps() {
    let base = Duration::from_millis(500);
    assert_eq!(backoff_delay(base, 1), base);
    assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
    assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
    assert_eq!(backoff_delay(base, 10), MAX_BACKOFF);
  }

  #[test]
  fn test_backoff_never_overflows() {
    assert_eq!(backoff_delay(Duration::from_millis(500), 40), MAX_BACKOFF);
    assert_eq!(backoff_delay(Duration::from_millis(u64::MAX), 2), MAX_BACKOFF);
    assert_eq!(backoff_delay(Duration::MAX, u32::MAX), MAX_BACKOFF);
  }

  #[tokio::test]
  async fn test_invalid_repo_is_unknown_without_request() {
    let client = GithubClient::new(GithubClientConfig {
      base_url: "http://127.0.0.1:9".to_string(),
      ..GithubClientConfig::default()
    })
    .unwrap();

    let err = client.fetch("not-a-slug", 1).await.unwrap_err();
    assert!(matches!(err, LookupError::InvalidRepo(_)));
    assert!(client.pull_request("not-a-slug", 1).await.is_none());
  }
}
