//! Program-derived addresses for markets, vaults and bets.
//!
//! The single canonical scheme:
//! - market: `["market", repo bytes, pr_number as u64 LE]`
//! - vault:  `["vault", market]`
//! - bet:    `["bet", market, bettor]`

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub const MARKET_SEED: &[u8] = b"market";
pub const VAULT_SEED: &[u8] = b"vault";
pub const BET_SEED: &[u8] = b"bet";

/// Maximum length of a single seed accepted by the runtime.
pub const MAX_SEED_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdaError {
    #[error("seed of {len} bytes exceeds the 32-byte limit")]
    SeedTooLong { len: usize },

    #[error("no viable bump seed for the given seeds")]
    NoViableBump,
}

fn find(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(PdaError::SeedTooLong { len: seed.len() });
    }
    Pubkey::try_find_program_address(seeds, program_id).ok_or(PdaError::NoViableBump)
}

/// Market address for a (repo, PR number) pair.
pub fn market_address(program_id: &Pubkey, repo: &str, pr_number: u64) -> Result<(Pubkey, u8), PdaError> {
    find(
        &[MARKET_SEED, repo.as_bytes(), &pr_number.to_le_bytes()],
        program_id,
    )
}

/// Escrow vault address owned by a market.
pub fn vault_address(program_id: &Pubkey, market: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    find(&[VAULT_SEED, market.as_ref()], program_id)
}

/// Bet address for a (market, bettor) pair.
pub fn bet_address(program_id: &Pubkey, market: &Pubkey, bettor: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    find(&[BET_SEED, market.as_ref(), bettor.as_ref()], program_id)
}
