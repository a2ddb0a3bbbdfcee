//! Solana RPC Ledger - Nonblocking RPC Client Gateway
//!
//! Implements the `Ledger` port over `solana_client`'s nonblocking
//! `RpcClient`. Reads use `getProgramAccounts` with memcmp filters;
//! writes build a single-instruction transaction signed by the
//! configured keypair and block until the configured commitment.
//!
//! Every `ClientError` is classified: an error that carries a
//! `TransactionError` means the ledger evaluated the transaction and
//! refused it; anything else (I/O, HTTP, timeout, unconfirmed) is a
//! transport failure whose effect is unknown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcProgramAccountsConfig;
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};
use tracing::{debug, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::ports::ledger::{AccountFilter, Ledger, LedgerError, RawAccount};

/// Ledger gateway backed by a Solana JSON-RPC endpoint.
///
/// The keypair is loaded once at startup and shared read-only; it
/// signs and pays for every submitted transaction.
pub struct SolanaLedger {
    /// Nonblocking RPC client with the configured commitment.
    rpc: RpcClient,
    /// Ship or Slip program owning the listed accounts.
    program_id: Pubkey,
    /// Signing and fee-paying key.
    payer: Arc<Keypair>,
}

impl SolanaLedger {
    /// Create a gateway without contacting the endpoint.
    pub fn new(
        rpc_url: String,
        timeout: Duration,
        commitment: CommitmentConfig,
        program_id: Pubkey,
        payer: Arc<Keypair>,
    ) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(rpc_url, timeout, commitment);
        Self {
            rpc,
            program_id,
            payer,
        }
    }

    /// Create a gateway from config and verify the endpoint answers.
    ///
    /// An unreachable or non-Solana endpoint is a startup error.
    #[instrument(skip_all)]
    pub async fn connect(config: &LedgerConfig, payer: Arc<Keypair>) -> Result<Self> {
        let ledger = Self::new(
            config.rpc_url.clone(),
            config.timeout(),
            config.commitment()?,
            config.program_id()?,
            payer,
        );

        let version = ledger
            .rpc
            .get_version()
            .await
            .with_context(|| format!("Failed to reach Solana RPC at {}", config.rpc_url))?;

        info!(
            solana_core = %version.solana_core,
            program = %ledger.program_id,
            signer = %ledger.payer.pubkey(),
            "Connected to Solana RPC"
        );

        Ok(ledger)
    }

    /// Program whose accounts this gateway lists.
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }
}

/// Map an RPC client error onto the port's error taxonomy.
pub fn classify_client_error(err: &ClientError) -> LedgerError {
    match err.get_transaction_error() {
        // A stale blockhash says nothing about market state
        Some(TransactionError::BlockhashNotFound) | None => LedgerError::Transport(err.to_string()),
        Some(tx_err) => LedgerError::Rejected(tx_err.to_string()),
    }
}

#[async_trait]
impl Ledger for SolanaLedger {
    #[instrument(skip(self, filters), fields(program = %self.program_id))]
    async fn list_accounts(&self, filters: &[AccountFilter]) -> Result<Vec<RawAccount>, LedgerError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(
                filters
                    .iter()
                    .map(|f| RpcFilterType::Memcmp(Memcmp::new_raw_bytes(f.offset, f.bytes.clone())))
                    .collect(),
            ),
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(&self.program_id, config)
            .await
            .map_err(|e| {
                warn!(error = %e, "getProgramAccounts failed");
                LedgerError::Transport(e.to_string())
            })?;

        debug!(count = accounts.len(), "Listed program accounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| RawAccount {
                address,
                data: account.data,
            })
            .collect())
    }

    #[instrument(skip(self, instruction), fields(program = %instruction.program_id))]
    async fn submit_and_confirm(&self, instruction: Instruction) -> Result<Signature, LedgerError> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| LedgerError::Transport(format!("blockhash unavailable: {e}")))?;

        let signers = [&*self.payer];
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.payer.pubkey()),
            &signers[..],
            blockhash,
        );

        match self.rpc.send_and_confirm_transaction(&tx).await {
            Ok(signature) => {
                debug!(%signature, "Transaction confirmed");
                Ok(signature)
            }
            Err(e) => {
                let err = classify_client_error(&e);
                warn!(error = %err, "Transaction not confirmed");
                Err(err)
            }
        }
    }

    fn signer(&self) -> Pubkey {
        self.payer.pubkey()
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::instruction::InstructionError;

    use super::*;

    #[test]
    fn test_program_error_is_rejection() {
        let err = ClientError::from(TransactionError::InstructionError(
            0,
            InstructionError::Custom(6001),
        ));
        assert!(matches!(classify_client_error(&err), LedgerError::Rejected(_)));
    }

    #[test]
    fn test_already_processed_is_rejection() {
        let err = ClientError::from(TransactionError::AlreadyProcessed);
        assert!(!classify_client_error(&err).is_retryable());
    }

    #[test]
    fn test_io_and_stale_blockhash_are_transport() {
        let io = ClientError::from(std::io::Error::other("connection reset"));
        assert!(classify_client_error(&io).is_retryable());

        let stale = ClientError::from(TransactionError::BlockhashNotFound);
        assert!(classify_client_error(&stale).is_retryable());
    }

    #[test]
    fn test_signer_is_payer() {
        let payer = Arc::new(Keypair::new());
        let ledger = SolanaLedger::new(
            "http://127.0.0.1:8899".to_string(),
            Duration::from_secs(1),
            CommitmentConfig::confirmed(),
            Pubkey::new_unique(),
            Arc::clone(&payer),
        );
        assert_eq!(ledger.signer(), payer.pubkey());
    }
}
