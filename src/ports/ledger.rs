//! Ledger Port - On-chain Account Store Interface
//!
//! Defines the trait for reading Ship or Slip accounts from the
//! ledger and submitting signed instructions to it. The ledger owns
//! all state transitions; this interface only observes and requests.
//!
//! Key design decisions:
//! - A transport failure is an `Err`, never an empty list, so callers
//!   can tell "couldn't fetch" apart from "no records"
//! - Submission errors are split into retryable transport failures
//!   and definitive ledger rejections

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Byte-prefix filter applied server-side to listed accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
  /// Offset into account data.
  pub offset: usize,
  /// Bytes that must appear at `offset`.
  pub bytes: Vec<u8>,
}

impl AccountFilter {
  /// Match accounts whose data starts with the given discriminator.
  pub fn discriminator(tag: [u8; 8]) -> Self {
    Self {
      offset: 0,
      bytes: tag.to_vec(),
    }
  }

  /// Match accounts holding `key` at `offset`.
  pub fn pubkey_at(offset: usize, key: &Pubkey) -> Self {
    Self {
      offset,
      bytes: key.to_bytes().to_vec(),
    }
  }

  /// Whether `data` satisfies this filter.
  pub fn matches(&self, data: &[u8]) -> bool {
    data
      .get(self.offset..)
      .and_then(|rest| rest.get(..self.bytes.len()))
      .is_some_and(|window| window == self.bytes.as_slice())
  }
}

/// An undecoded account as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
  /// Account key.
  pub address: Pubkey,
  /// Raw account data.
  pub data: Vec<u8>,
}

/// Failure talking to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
  /// Network, timeout or confirmation failure. Nothing is known to
  /// have changed; safe to try again next cycle.
  #[error("ledger transport error: {0}")]
  Transport(String),

  /// The ledger evaluated and refused the transaction (stale state,
  /// already resolved, wrong authority). Must not be blindly resent.
  #[error("ledger rejected transaction: {0}")]
  Rejected(String),
}

impl LedgerError {
  /// Whether the same request may succeed on a later attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Transport(_) => true,
      Self::Rejected(_) => false,
    }
  }
}

/// Trait for ledger gateways.
///
/// Implementors hold the signing key for submissions; it is loaded
/// once at startup and never changes.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
  /// List program accounts matching all `filters`.
  async fn list_accounts(
    &self,
    filters: &[AccountFilter],
  ) -> Result<Vec<RawAccount>, LedgerError>;

  /// Sign, send and wait for confirmation of a single instruction.
  ///
  /// # Errors
  /// `Transport` if the outcome is unknown, `Rejected` if the ledger
  /// refused the transaction.
  async fn submit_and_confirm(
    &self,
    instruction: Instruction,
  ) -> Result<Signature, LedgerError>;

  /// Public key that signs and pays for submissions.
  fn signer(&self) -> Pubkey;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_matching() {
    let key = Pubkey::new_unique();
    let filter = AccountFilter::pubkey_at(8, &key);

    let mut data = vec![0u8; 8];
    data.extend_from_slice(key.as_ref());
    assert!(filter.matches(&data));

    data[8] ^= 0xFF;
    assert!(!filter.matches(&data));
    assert!(!filter.matches(&[0u8; 12]));
  }

  #[test]
  fn test_only_transport_is_retryable() {
    assert!(LedgerError::Transport("timeout".into()).is_retryable());
    assert!(!LedgerError::Rejected("already resolved".into()).is_retryable());
  }
}
