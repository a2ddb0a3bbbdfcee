//! GitHub REST API Response Types
//!
//! Only the fields the oracle reads from `GET /repos/{owner}/{repo}
//! /pulls/{number}` are modelled; everything else is ignored.

use serde::Deserialize;

use crate::domain::pull_request::{PrState, PullRequest};

/// Pull request payload from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct PullResponse {
  /// "open" or "closed".
  pub state: String,
  /// True once merged (merged PRs are also "closed"). Required: a
  /// payload without it cannot tell merged from closed.
  pub merged: bool,
  /// PR title.
  #[serde(default)]
  pub title: String,
  /// Author, absent for deleted accounts.
  pub user: Option<UserRef>,
  /// ISO-8601 merge timestamp.
  pub merged_at: Option<String>,
  /// ISO-8601 close timestamp.
  pub closed_at: Option<String>,
}

/// Minimal user object.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
  /// GitHub login.
  pub login: Option<String>,
}

impl From<PullResponse> for PullRequest {
  fn from(pr: PullResponse) -> Self {
    let state = if pr.merged {
      PrState::Merged
    } else if pr.state == "closed" {
      PrState::Closed
    } else {
      PrState::Open
    };

    Self {
      state,
      title: pr.title,
      author: pr
        .user
        .and_then(|u| u.login)
        .unwrap_or_else(|| "unknown".to_string()),
      merged_at: pr.merged_at,
      closed_at: pr.closed_at,
    }
  }
}

/// Rate limit info from response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
  /// Remaining requests in current window.
  pub remaining: u32,
  /// Window reset time (Unix seconds).
  pub reset_epoch_secs: u64,
  /// Maximum requests per window.
  pub limit: u32,
}
