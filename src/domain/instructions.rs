//! Instruction builders for the Ship or Slip program.
//!
//! Each builder derives the program addresses it needs, encodes the
//! payload via `domain::codec` and lists accounts in the order the
//! program expects.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use thiserror::Error;

use super::codec::{self, CodecError};
use super::market::Side;
use super::pda::{self, PdaError};

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Pda(#[from] PdaError),
}

/// Resolve a market with the given winning side, signed by the oracle.
pub fn resolve_market(
    program_id: &Pubkey,
    market: &Pubkey,
    oracle: &Pubkey,
    outcome: Side,
) -> Result<Instruction, InstructionError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*market, false),
            AccountMeta::new_readonly(*oracle, true),
        ],
        data: codec::encode_resolve(outcome)?,
    })
}

/// Create the market for `repo#pr_number`, paid for by `creator`.
pub fn create_market(
    program_id: &Pubkey,
    creator: &Pubkey,
    repo: &str,
    pr_number: u64,
    deadline: i64,
) -> Result<Instruction, InstructionError> {
    let (market, _) = pda::market_address(program_id, repo, pr_number)?;
    let (vault, _) = pda::vault_address(program_id, &market)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(market, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: codec::encode_create_market(repo, pr_number, deadline)?,
    })
}

/// Stake `amount` lamports from `bettor` on `side`.
pub fn place_bet(
    program_id: &Pubkey,
    market: &Pubkey,
    bettor: &Pubkey,
    side: Side,
    amount: u64,
) -> Result<Instruction, InstructionError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: bettor_accounts(program_id, market, bettor)?,
        data: codec::encode_place_bet(side, amount)?,
    })
}

/// Claim the payout of a winning bet on a resolved market.
pub fn claim_winnings(
    program_id: &Pubkey,
    market: &Pubkey,
    bettor: &Pubkey,
) -> Result<Instruction, InstructionError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: bettor_accounts(program_id, market, bettor)?,
        data: codec::encode_claim(),
    })
}

fn bettor_accounts(
    program_id: &Pubkey,
    market: &Pubkey,
    bettor: &Pubkey,
) -> Result<Vec<AccountMeta>, PdaError> {
    let (vault, _) = pda::vault_address(program_id, market)?;
    let (bet, _) = pda::bet_address(program_id, market, bettor)?;

    Ok(vec![
        AccountMeta::new(*market, false),
        AccountMeta::new(vault, false),
        AccountMeta::new(bet, false),
        AccountMeta::new(*bettor, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ])
}
