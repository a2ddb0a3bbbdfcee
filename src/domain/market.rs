//! Core market domain types.
//!
//! Defines the decoded Ship or Slip ledger records (markets and bets)
//! and the closed enums that describe their lifecycle. Records are
//! produced by `domain::codec` and observed read-only by the oracle.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

// ────────────────────────────────────────────
// Closed enums stored as single bytes on-chain
// ────────────────────────────────────────────

/// Market lifecycle status.
///
/// Transitions Open → Resolved exactly once, performed by the
/// on-chain program in response to a valid resolve instruction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum MarketStatus {
    Open = 0,
    Resolved = 1,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// Terminal outcome recorded on a market.
///
/// `Pending` while the market is open; `Ship` or `Slip` once resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum Outcome {
    Pending = 0,
    Ship = 1,
    Slip = 2,
}

impl From<Side> for Outcome {
    fn from(side: Side) -> Self {
        match side {
            Side::Ship => Self::Ship,
            Side::Slip => Self::Slip,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ship => write!(f, "ship"),
            Self::Slip => write!(f, "slip"),
        }
    }
}

/// A side of the proposition: the PR ships (merged) or slips (closed).
///
/// Used both for bets and for the resolve instruction payload, which
/// share the same 0 = Ship, 1 = Slip byte encoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum Side {
    Ship = 0,
    Slip = 1,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ship => write!(f, "ship"),
            Self::Slip => write!(f, "slip"),
        }
    }
}

// ────────────────────────────────────────────
// Decoded ledger records
// ────────────────────────────────────────────

/// A decoded market account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Ledger account key of this market.
    pub address: Pubkey,
    /// Account permitted to manage the market (enforced on-chain).
    pub authority: Pubkey,
    /// GitHub repository, `owner/name`.
    pub repo: String,
    /// Pull request number within `repo`.
    pub pr_number: u64,
    /// Unix seconds after which resolution is permitted.
    pub deadline: i64,
    /// Lamports staked on Ship.
    pub ship_pool: u64,
    /// Lamports staked on Slip.
    pub slip_pool: u64,
    /// Distinct participants.
    pub total_bettors: u32,
    pub status: MarketStatus,
    pub outcome: Outcome,
}

impl Market {
    /// Whether the market still accepts a resolution request.
    pub fn is_open(&self) -> bool {
        match self.status {
            MarketStatus::Open => true,
            MarketStatus::Resolved => false,
        }
    }

    /// Resolution is permitted once `now` reaches the deadline.
    pub fn is_past_deadline(&self, now: i64) -> bool {
        now >= self.deadline
    }

    /// Combined stake of both sides, saturating on overflow.
    pub fn total_pool(&self) -> u64 {
        self.ship_pool.saturating_add(self.slip_pool)
    }

    /// Stake on the given side.
    pub fn pool_for(&self, side: Side) -> u64 {
        match side {
            Side::Ship => self.ship_pool,
            Side::Slip => self.slip_pool,
        }
    }
}

/// A decoded bet account. At most one exists per (market, bettor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    /// Ledger account key of this bet.
    pub address: Pubkey,
    pub bettor: Pubkey,
    /// Address of the market this bet belongs to.
    pub market: Pubkey,
    pub side: Side,
    /// Stake in lamports.
    pub amount: u64,
    pub claimed: bool,
}

// ────────────────────────────────────────────
// Repository slug
// ────────────────────────────────────────────

/// A parsed `owner/name` GitHub repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

/// Error returned when a repository string is not `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid repository slug {0:?}, expected owner/name")]
pub struct InvalidRepoSlug(pub String);

impl FromStr for RepoSlug {
    type Err = InvalidRepoSlug;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| InvalidRepoSlug(s.to_string()))?;

        let valid = |part: &str| {
            !part.is_empty()
                && !part.contains('/')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
        };

        if !valid(owner) || !valid(name) {
            return Err(InvalidRepoSlug(s.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ────────────────────────────────────────────
// Unit conversions
// ────────────────────────────────────────────

/// Convert lamports to SOL for display.
#[allow(clippy::cast_precision_loss)]
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert a SOL amount to lamports, flooring fractional lamports.
///
/// Negative and non-finite inputs yield zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sol_to_lamports(sol: f64) -> u64 {
    if !sol.is_finite() || sol <= 0.0 {
        return 0;
    }
    (sol * LAMPORTS_PER_SOL as f64).floor() as u64
}
