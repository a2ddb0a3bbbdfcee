//! Pull request status as seen by the oracle.

use serde::{Deserialize, Serialize};

use super::market::Side;

/// Observed state of a GitHub pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Merged,
    /// Closed without being merged.
    Closed,
}

impl PrState {
    /// Winning side once the PR has concluded, `None` while it is open.
    pub fn decision(self) -> Option<Side> {
        match self {
            Self::Open => None,
            Self::Merged => Some(Side::Ship),
            Self::Closed => Some(Side::Slip),
        }
    }
}

/// Pull request details returned by a status source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub state: PrState,
    pub title: String,
    /// Login of the PR author, `"unknown"` when absent.
    pub author: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_mapping() {
        assert_eq!(PrState::Open.decision(), None);
        assert_eq!(PrState::Merged.decision(), Some(Side::Ship));
        assert_eq!(PrState::Closed.decision(), Some(Side::Slip));
    }
}
