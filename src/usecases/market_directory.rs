//! Market Directory Use Case - Read-side Queries
//!
//! Lists and decodes market and bet accounts for dashboards and
//! client tooling. Undecodable accounts are skipped; a transport
//! failure is always an `Err` so "couldn't fetch" is never mistaken
//! for "no records".

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, instrument, warn};

use crate::domain::codec::{
  self, BET_BETTOR_OFFSET, BET_DISCRIMINATOR, MARKET_DISCRIMINATOR, MARKET_REPO_OFFSET,
};
use crate::domain::market::{Bet, Market};
use crate::domain::pda;
use crate::ports::ledger::{AccountFilter, Ledger, LedgerError};

/// Read-only view over the program's accounts.
pub struct MarketDirectory<L: Ledger> {
  ledger: Arc<L>,
  program_id: Pubkey,
}

impl<L: Ledger> MarketDirectory<L> {
  /// Create a directory for `program_id`.
  pub fn new(ledger: Arc<L>, program_id: Pubkey) -> Self {
    Self { ledger, program_id }
  }

  /// Every decodable market, open or resolved.
  #[instrument(skip(self))]
  pub async fn all_markets(&self) -> Result<Vec<Market>, LedgerError> {
    let accounts = self
      .ledger
      .list_accounts(&[AccountFilter::discriminator(MARKET_DISCRIMINATOR)])
      .await?;

    let markets: Vec<Market> = accounts
      .into_iter()
      .filter_map(|account| match codec::decode_market(account.address, &account.data) {
        Ok(market) => Some(market),
        Err(e) => {
          warn!(market = %account.address, error = %e, "Skipping undecodable market account");
          None
        }
      })
      .collect();

    debug!(count = markets.len(), "Loaded markets");
    Ok(markets)
  }

  /// Markets still awaiting resolution.
  pub async fn open_markets(&self) -> Result<Vec<Market>, LedgerError> {
    let mut markets = self.all_markets().await?;
    markets.retain(Market::is_open);
    Ok(markets)
  }

  /// Bets placed by `owner`, across all markets.
  #[instrument(skip(self), fields(owner = %owner))]
  pub async fn bets_for(&self, owner: &Pubkey) -> Result<Vec<Bet>, LedgerError> {
    let accounts = self
      .ledger
      .list_accounts(&[
        AccountFilter::discriminator(BET_DISCRIMINATOR),
        AccountFilter::pubkey_at(BET_BETTOR_OFFSET, owner),
      ])
      .await?;

    Ok(
      accounts
        .into_iter()
        .filter_map(|account| match codec::decode_bet(account.address, &account.data) {
          Ok(bet) => Some(bet),
          Err(e) => {
            warn!(bet = %account.address, error = %e, "Skipping undecodable bet account");
            None
          }
        })
        .collect(),
    )
  }

  /// The market for `repo#pr_number`, if one has been created.
  ///
  /// The ledger filters on the stored repo and PR number, so only the
  /// candidate account is fetched; its address must also match the
  /// derived one.
  #[instrument(skip(self))]
  pub async fn market_for(&self, repo: &str, pr_number: u64) -> Result<Option<Market>, LedgerError> {
    let address = match pda::market_address(&self.program_id, repo, pr_number) {
      Ok((address, _)) => address,
      Err(e) => {
        // No market can exist at an underivable address
        debug!(repo, pr = pr_number, error = %e, "Market address not derivable");
        return Ok(None);
      }
    };
    let key = match codec::encode_market_key(repo, pr_number) {
      Ok(key) => key,
      Err(e) => {
        warn!(repo, pr = pr_number, error = %e, "Market key not encodable");
        return Ok(None);
      }
    };

    let accounts = self
      .ledger
      .list_accounts(&[
        AccountFilter::discriminator(MARKET_DISCRIMINATOR),
        AccountFilter {
          offset: MARKET_REPO_OFFSET,
          bytes: key,
        },
      ])
      .await?;

    Ok(
      accounts
        .into_iter()
        .filter(|account| account.address == address)
        .find_map(|account| match codec::decode_market(account.address, &account.data) {
          Ok(market) => Some(market),
          Err(e) => {
            warn!(market = %account.address, error = %e, "Skipping undecodable market account");
            None
          }
        }),
    )
  }
}
