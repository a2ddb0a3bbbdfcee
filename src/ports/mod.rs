//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Ledger`: On-chain account listing and instruction submission
//! - `PrStatusSource`: Pull request state from the issue tracker

pub mod ledger;
pub mod pr_status;
