//! GitHub REST API Adapter
//!
//! Implements the pull request status lookup used by the oracle to
//! decide whether a market's PR shipped (merged) or slipped (closed).
//!
//! Sub-modules:
//! - `client`: HTTP client with quota, concurrency cap and retries
//! - `types`: API response type definitions

pub mod client;
pub mod types;

pub use client::{GithubClient, GithubClientConfig};
