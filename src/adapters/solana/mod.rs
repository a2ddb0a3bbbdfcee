//! Solana Adapters - Ledger Access via solana-client
//!
//! Provides on-chain access for:
//! - Program account listing with memcmp filters
//! - Signed instruction submission with confirmation
//! - Oracle keypair loading from solana-keygen files

pub mod keypair;
pub mod rpc;

pub use keypair::load_keypair;
pub use rpc::SolanaLedger;
