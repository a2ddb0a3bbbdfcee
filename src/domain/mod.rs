//! Domain layer - Ship or Slip records, layouts and addresses.
//!
//! Pure code only: no I/O, no async. The codec, address derivation and
//! instruction builders here are shared by the oracle loop and by
//! client-side helpers.

pub mod codec;
pub mod instructions;
pub mod market;
pub mod pda;
pub mod pull_request;

// Re-export core types for convenience
pub use codec::{CodecError, DecodeError};
pub use market::{Bet, Market, MarketStatus, Outcome, RepoSlug, Side};
pub use pull_request::{PrState, PullRequest};
