//! Oracle signing key loading.

use std::path::Path;

use anyhow::{Context, Result};
use solana_sdk::signature::Keypair;

/// Read a solana-keygen JSON keypair file (a 64-byte JSON array).
///
/// A missing or malformed file is a fatal configuration error.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;
    parse_keypair(&data).with_context(|| format!("Invalid keypair file: {}", path.display()))
}

/// Parse the JSON array form of a keypair.
pub fn parse_keypair(json: &str) -> Result<Keypair> {
    let bytes: Vec<u8> = serde_json::from_str(json).context("Keypair is not a JSON byte array")?;
    anyhow::ensure!(bytes.len() == 64, "Keypair must be 64 bytes, got {}", bytes.len());
    Keypair::from_bytes(&bytes).map_err(|e| anyhow::anyhow!("Invalid keypair bytes: {e}"))
}
