//! Market Service Use Case - Wallet-side Market Actions
//!
//! Creates markets, places bets and claims winnings on behalf of the
//! ledger's signing wallet. Inputs are validated before anything is
//! submitted; every failure reaches the caller with a readable reason.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::instructions::{self, InstructionError};
use crate::domain::market::{InvalidRepoSlug, RepoSlug, Side};
use crate::domain::pda;
use crate::ports::ledger::{Ledger, LedgerError};

/// Why a market action was not carried out.
#[derive(Debug, Error)]
pub enum MarketServiceError {
  #[error(transparent)]
  InvalidRepo(#[from] InvalidRepoSlug),

  #[error("bet amount must be greater than zero")]
  ZeroAmount,

  #[error("could not build transaction: {0}")]
  Instruction(#[from] InstructionError),

  #[error("transaction failed: {0}")]
  Ledger(#[from] LedgerError),
}

/// A market created by `create_market`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMarket {
  /// Market account key.
  pub address: Pubkey,
  /// Confirmed transaction.
  pub signature: Signature,
}

/// Market actions signed by the ledger's wallet.
pub struct MarketService<L: Ledger> {
  ledger: Arc<L>,
  program_id: Pubkey,
}

impl<L: Ledger> MarketService<L> {
  /// Create a service for `program_id`.
  pub fn new(ledger: Arc<L>, program_id: Pubkey) -> Self {
    Self { ledger, program_id }
  }

  /// Open a market on `repo#pr_number` closing at `deadline`.
  #[instrument(skip(self))]
  pub async fn create_market(
    &self,
    repo: &str,
    pr_number: u64,
    deadline: i64,
  ) -> Result<CreatedMarket, MarketServiceError> {
    let slug = Self::validate_repo(repo)?;
    let repo = slug.to_string();
    let creator = self.ledger.signer();

    let (address, _) = pda::market_address(&self.program_id, &repo, pr_number)
      .map_err(InstructionError::from)?;
    let instruction =
      instructions::create_market(&self.program_id, &creator, &repo, pr_number, deadline)?;
    let signature = self.ledger.submit_and_confirm(instruction).await?;

    info!(market = %address, %signature, "Market created");
    Ok(CreatedMarket { address, signature })
  }

  /// Stake `amount` lamports on `side` of `repo#pr_number`.
  #[instrument(skip(self))]
  pub async fn place_bet(
    &self,
    repo: &str,
    pr_number: u64,
    side: Side,
    amount: u64,
  ) -> Result<Signature, MarketServiceError> {
    if amount == 0 {
      return Err(MarketServiceError::ZeroAmount);
    }

    let market = self.market_address(repo, pr_number)?;
    let bettor = self.ledger.signer();
    let instruction = instructions::place_bet(&self.program_id, &market, &bettor, side, amount)?;
    let signature = self.ledger.submit_and_confirm(instruction).await?;

    info!(%market, %signature, "Bet placed");
    Ok(signature)
  }

  /// Claim the wallet's winnings on a resolved market.
  #[instrument(skip(self))]
  pub async fn claim_winnings(&self, repo: &str, pr_number: u64) -> Result<Signature, MarketServiceError> {
    let market = self.market_address(repo, pr_number)?;
    let bettor = self.ledger.signer();
    let instruction = instructions::claim_winnings(&self.program_id, &market, &bettor)?;
    let signature = self.ledger.submit_and_confirm(instruction).await?;

    info!(%market, %signature, "Winnings claimed");
    Ok(signature)
  }

  fn market_address(&self, repo: &str, pr_number: u64) -> Result<Pubkey, MarketServiceError> {
    let slug = Self::validate_repo(repo)?;
    let (address, _) = pda::market_address(&self.program_id, &slug.to_string(), pr_number)
      .map_err(InstructionError::from)?;
    Ok(address)
  }

  fn validate_repo(repo: &str) -> Result<RepoSlug, MarketServiceError> {
    Ok(repo.trim().parse::<RepoSlug>()?)
  }
}
