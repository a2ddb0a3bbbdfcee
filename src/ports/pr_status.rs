//! PR Status Port - External Issue Tracker Interface
//!
//! Defines the trait for looking up the state of a pull request.
//! Lookups are infallible by contract: any transport failure, rate
//! limit or malformed payload is reported as `None` ("unknown"),
//! which the oracle treats exactly like a still-open PR.

use async_trait::async_trait;

use crate::domain::pull_request::PullRequest;

/// Trait for pull request status providers.
#[async_trait]
pub trait PrStatusSource: Send + Sync + 'static {
  /// Fetch `repo#number`, `None` if the status can't be determined.
  async fn pull_request(&self, repo: &str, number: u64) -> Option<PullRequest>;
}
