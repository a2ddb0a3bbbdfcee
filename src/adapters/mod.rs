//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (Solana RPC, GitHub REST API, Prometheus).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `solana`: Ledger gateway and keypair loading via solana-client
//! - `github`: Pull request status lookups over reqwest
//! - `metrics`: Prometheus metrics export and health checks

pub mod github;
pub mod metrics;
pub mod solana;
