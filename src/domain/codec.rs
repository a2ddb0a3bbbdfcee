//! Account Codec - Byte-exact Ship or Slip Layouts
//!
//! Pure functions mapping the on-chain program's binary layouts to
//! domain types. Every record and instruction starts with an 8-byte
//! Anchor discriminator (`sha256("<namespace>:<name>")[..8]`); the body
//! is Borsh: little-endian fixed-width integers, `u32` length-prefixed
//! UTF-8 strings, single-byte enums.
//!
//! Decoding is total: truncated, corrupt or adversarial input yields a
//! `DecodeError`, never a panic.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use super::market::{Bet, Market, MarketStatus, Outcome, Side};

// ────────────────────────────────────────────
// Discriminators
// ────────────────────────────────────────────

/// `sha256("account:Market")[..8]`
pub const MARKET_DISCRIMINATOR: [u8; 8] = [219, 190, 213, 55, 0, 227, 198, 154];
/// `sha256("account:Bet")[..8]`
pub const BET_DISCRIMINATOR: [u8; 8] = [147, 23, 35, 59, 15, 75, 155, 32];
/// `sha256("global:create_market")[..8]`
pub const CREATE_MARKET_DISCRIMINATOR: [u8; 8] = [103, 226, 97, 235, 200, 188, 251, 254];
/// `sha256("global:place_bet")[..8]`
pub const PLACE_BET_DISCRIMINATOR: [u8; 8] = [222, 62, 67, 220, 63, 166, 126, 33];
/// `sha256("global:resolve_market")[..8]`
pub const RESOLVE_MARKET_DISCRIMINATOR: [u8; 8] = [155, 23, 80, 173, 46, 74, 23, 239];
/// `sha256("global:claim_winnings")[..8]`
pub const CLAIM_WINNINGS_DISCRIMINATOR: [u8; 8] = [161, 215, 24, 59, 14, 236, 242, 221];

/// Length of every discriminator prefix.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Byte offset of `Bet.bettor`, used for owner memcmp filters.
pub const BET_BETTOR_OFFSET: usize = DISCRIMINATOR_LEN;

/// Byte offset of `Market.repo`, which is immediately followed by
/// `Market.pr_number`.
pub const MARKET_REPO_OFFSET: usize = DISCRIMINATOR_LEN + 32;

/// Smallest valid market account: empty repo string.
pub const MIN_MARKET_LEN: usize = DISCRIMINATOR_LEN + 32 + 4 + 8 + 8 + 8 + 8 + 4 + 1 + 1;

/// Exact bet account body length (plus discriminator).
pub const MIN_BET_LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 1 + 8 + 1;

/// Compute an Anchor discriminator for `namespace:name`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Why an account buffer could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("account data too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("unexpected discriminator {found:?}, expected {expected:?}")]
    Discriminator { found: [u8; 8], expected: [u8; 8] },

    #[error("malformed account body: {0}")]
    Malformed(#[from] std::io::Error),

    #[error("inconsistent market: status {status} with outcome {outcome}")]
    Inconsistent {
        status: MarketStatus,
        outcome: Outcome,
    },
}

/// Why a payload could not be encoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] std::io::Error),
}

// ────────────────────────────────────────────
// Wire layouts
// ────────────────────────────────────────────

#[derive(BorshSerialize, BorshDeserialize)]
struct MarketLayout {
    authority: [u8; 32],
    repo: String,
    pr_number: u64,
    deadline: i64,
    ship_pool: u64,
    slip_pool: u64,
    total_bettors: u32,
    status: MarketStatus,
    outcome: Outcome,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct BetLayout {
    bettor: [u8; 32],
    market: [u8; 32],
    side: Side,
    amount: u64,
    // Any non-zero byte means claimed; a Borsh bool would reject 2..=255.
    claimed: u8,
}

#[derive(BorshSerialize)]
struct CreateMarketArgs<'a> {
    repo: &'a str,
    pr_number: u64,
    deadline: i64,
}

#[derive(BorshSerialize)]
struct MarketKey<'a> {
    repo: &'a str,
    pr_number: u64,
}

#[derive(BorshSerialize)]
struct PlaceBetArgs {
    side: Side,
    amount: u64,
}

#[derive(BorshSerialize)]
struct ResolveMarketArgs {
    outcome: Side,
}

// ────────────────────────────────────────────
// Decoding
// ────────────────────────────────────────────

/// Check length and discriminator, returning the body after the tag.
fn body<'a>(data: &'a [u8], expected: &[u8; 8], min: usize) -> Result<&'a [u8], DecodeError> {
    if data.len() < min {
        return Err(DecodeError::TooShort {
            len: data.len(),
            min,
        });
    }

    let (tag, rest) = data.split_at(DISCRIMINATOR_LEN);
    if tag != expected {
        let mut found = [0u8; DISCRIMINATOR_LEN];
        found.copy_from_slice(tag);
        return Err(DecodeError::Discriminator {
            found,
            expected: *expected,
        });
    }

    Ok(rest)
}

/// Decode a market account. Trailing bytes (the PDA bump) are ignored.
pub fn decode_market(address: Pubkey, data: &[u8]) -> Result<Market, DecodeError> {
    let mut rest = body(data, &MARKET_DISCRIMINATOR, MIN_MARKET_LEN)?;
    let layout = MarketLayout::deserialize(&mut rest)?;

    match (layout.status, layout.outcome) {
        (MarketStatus::Open, Outcome::Pending)
        | (MarketStatus::Resolved, Outcome::Ship | Outcome::Slip) => {}
        (status, outcome) => return Err(DecodeError::Inconsistent { status, outcome }),
    }

    Ok(Market {
        address,
        authority: Pubkey::new_from_array(layout.authority),
        repo: layout.repo,
        pr_number: layout.pr_number,
        deadline: layout.deadline,
        ship_pool: layout.ship_pool,
        slip_pool: layout.slip_pool,
        total_bettors: layout.total_bettors,
        status: layout.status,
        outcome: layout.outcome,
    })
}

/// Decode a bet account.
pub fn decode_bet(address: Pubkey, data: &[u8]) -> Result<Bet, DecodeError> {
    let mut rest = body(data, &BET_DISCRIMINATOR, MIN_BET_LEN)?;
    let layout = BetLayout::deserialize(&mut rest)?;

    Ok(Bet {
        address,
        bettor: Pubkey::new_from_array(layout.bettor),
        market: Pubkey::new_from_array(layout.market),
        side: layout.side,
        amount: layout.amount,
        claimed: layout.claimed != 0,
    })
}

// ────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────

fn tagged<T: BorshSerialize>(tag: &[u8; 8], payload: &T) -> Result<Vec<u8>, CodecError> {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(tag);
    payload.serialize(&mut data)?;
    Ok(data)
}

/// Encode a market into its stored account layout.
pub fn encode_market_account(market: &Market) -> Result<Vec<u8>, CodecError> {
    tagged(
        &MARKET_DISCRIMINATOR,
        &MarketLayout {
            authority: market.authority.to_bytes(),
            repo: market.repo.clone(),
            pr_number: market.pr_number,
            deadline: market.deadline,
            ship_pool: market.ship_pool,
            slip_pool: market.slip_pool,
            total_bettors: market.total_bettors,
            status: market.status,
            outcome: market.outcome,
        },
    )
}

/// Encode a bet into its stored account layout.
pub fn encode_bet_account(bet: &Bet) -> Result<Vec<u8>, CodecError> {
    tagged(
        &BET_DISCRIMINATOR,
        &BetLayout {
            bettor: bet.bettor.to_bytes(),
            market: bet.market.to_bytes(),
            side: bet.side,
            amount: bet.amount,
            claimed: u8::from(bet.claimed),
        },
    )
}

/// `resolve_market` payload: tag + outcome byte (0 = Ship, 1 = Slip).
pub fn encode_resolve(outcome: Side) -> Result<Vec<u8>, CodecError> {
    tagged(&RESOLVE_MARKET_DISCRIMINATOR, &ResolveMarketArgs { outcome })
}

/// `create_market` payload: tag + repo string + u64 PR number + i64 deadline.
pub fn encode_create_market(repo: &str, pr_number: u64, deadline: i64) -> Result<Vec<u8>, CodecError> {
    tagged(
        &CREATE_MARKET_DISCRIMINATOR,
        &CreateMarketArgs {
            repo,
            pr_number,
            deadline,
        },
    )
}

/// Stored bytes of a market's repo and PR number, starting at
/// `MARKET_REPO_OFFSET`.
pub fn encode_market_key(repo: &str, pr_number: u64) -> Result<Vec<u8>, CodecError> {
    let mut data = Vec::with_capacity(4 + repo.len() + 8);
    MarketKey { repo, pr_number }.serialize(&mut data)?;
    Ok(data)
}

/// `place_bet` payload: tag + side byte + u64 lamports.
pub fn encode_place_bet(side: Side, amount: u64) -> Result<Vec<u8>, CodecError> {
    tagged(&PLACE_BET_DISCRIMINATOR, &PlaceBetArgs { side, amount })
}

/// `claim_winnings` payload: tag only.
pub fn encode_claim() -> Vec<u8> {
    CLAIM_WINNINGS_DISCRIMINATOR.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_market() -> Market {
        Market {
            address: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            repo: "rust-lang/rust".to_string(),
            pr_number: 123_456,
            deadline: 1_700_000_000,
            ship_pool: 5_000_000_000,
            slip_pool: 1_250_000_000,
            total_bettors: 7,
            status: MarketStatus::Open,
            outcome: Outcome::Pending,
        }
    }

    #[test]
    fn test_discriminators_match_anchor_derivation() {
        assert_eq!(discriminator("account", "Market"), MARKET_DISCRIMINATOR);
        assert_eq!(discriminator("account", "Bet"), BET_DISCRIMINATOR);
        assert_eq!(discriminator("global", "create_market"), CREATE_MARKET_DISCRIMINATOR);
        assert_eq!(discriminator("global", "place_bet"), PLACE_BET_DISCRIMINATOR);
        assert_eq!(discriminator("global", "resolve_market"), RESOLVE_MARKET_DISCRIMINATOR);
        assert_eq!(discriminator("global", "claim_winnings"), CLAIM_WINNINGS_DISCRIMINATOR);
    }

    #[test]
    fn test_market_layout_is_byte_exact() {
        let market = sample_market();
        let data = encode_market_account(&market).unwrap();

        assert_eq!(&data[..8], &MARKET_DISCRIMINATOR);
        assert_eq!(&data[8..40], market.authority.as_ref());
        assert_eq!(&data[40..44], &14u32.to_le_bytes());
        assert_eq!(&data[44..58], b"rust-lang/rust");
        assert_eq!(&data[58..66], &123_456u64.to_le_bytes());
        assert_eq!(&data[66..74], &1_700_000_000i64.to_le_bytes());
        assert_eq!(&data[74..82], &5_000_000_000u64.to_le_bytes());
        assert_eq!(&data[82..90], &1_250_000_000u64.to_le_bytes());
        assert_eq!(&data[90..94], &7u32.to_le_bytes());
        assert_eq!(data[94], 0);
        assert_eq!(data[95], 0);
        assert_eq!(data.len(), MIN_MARKET_LEN + 14);
    }

    #[test]
    fn test_decode_market_round_trip_with_trailing_bump() {
        let mut market = sample_market();
        market.status = MarketStatus::Resolved;
        market.outcome = Outcome::Slip;

        let mut data = encode_market_account(&market).unwrap();
        data.push(254);

        let decoded = decode_market(market.address, &data).unwrap();
        assert_eq!(decoded, market);
    }

    #[test]
    fn test_decode_market_rejects_string_overrun() {
        let mut data = encode_market_account(&sample_market()).unwrap();
        data[40..44].copy_from_slice(&10_000u32.to_le_bytes());

        let err = decode_market(Pubkey::new_unique(), &data).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_market_rejects_invalid_utf8() {
        let mut data = encode_market_account(&sample_market()).unwrap();
        data[44] = 0xFF;
        assert!(decode_market(Pubkey::new_unique(), &data).is_err());
    }

    #[test]
    fn test_decode_market_rejects_unknown_enum_bytes() {
        let market = sample_market();
        let data = encode_market_account(&market).unwrap();
        let status_at = data.len() - 2;

        let mut bad_status = data.clone();
        bad_status[status_at] = 7;
        assert!(decode_market(market.address, &bad_status).is_err());

        let mut bad_outcome = data;
        bad_outcome[status_at + 1] = 3;
        assert!(decode_market(market.address, &bad_outcome).is_err());
    }

    #[test]
    fn test_decode_market_rejects_open_with_outcome() {
        let mut market = sample_market();
        market.outcome = Outcome::Ship;
        let data = encode_market_account(&market).unwrap();

        let err = decode_market(market.address, &data).unwrap_err();
        assert!(matches!(err, DecodeError::Inconsistent { .. }));
    }

    #[test]
    fn test_decode_market_rejects_wrong_discriminator() {
        let mut data = encode_market_account(&sample_market()).unwrap();
        data[..8].copy_from_slice(&BET_DISCRIMINATOR);

        let err = decode_market(Pubkey::new_unique(), &data).unwrap_err();
        assert!(matches!(err, DecodeError::Discriminator { .. }));
    }

    #[test]
    fn test_decode_short_buffers() {
        for len in 0..MIN_MARKET_LEN {
            let data = vec![0u8; len];
            assert!(matches!(
                decode_market(Pubkey::default(), &data),
                Err(DecodeError::TooShort { .. })
            ));
            assert!(decode_bet(Pubkey::default(), &data).is_err());
        }
    }

    #[test]
    fn test_bet_layout_and_claimed_flag() {
        let bet = Bet {
            address: Pubkey::new_unique(),
            bettor: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            side: Side::Slip,
            amount: 42,
            claimed: false,
        };
        let mut data = encode_bet_account(&bet).unwrap();
        assert_eq!(data.len(), MIN_BET_LEN);
        assert_eq!(&data[BET_BETTOR_OFFSET..BET_BETTOR_OFFSET + 32], bet.bettor.as_ref());
        assert_eq!(data[72], 1);

        assert_eq!(decode_bet(bet.address, &data).unwrap(), bet);

        // Any non-zero claimed byte counts as claimed
        data[81] = 9;
        assert!(decode_bet(bet.address, &data).unwrap().claimed);
    }

    #[test]
    fn test_decode_bet_rejects_unknown_side() {
        let bet = Bet {
            address: Pubkey::new_unique(),
            bettor: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            side: Side::Ship,
            amount: 1,
            claimed: true,
        };
        let mut data = encode_bet_account(&bet).unwrap();
        data[72] = 2;
        assert!(decode_bet(bet.address, &data).is_err());
    }

    #[test]
    fn test_resolve_payload() {
        let ship = encode_resolve(Side::Ship).unwrap();
        let slip = encode_resolve(Side::Slip).unwrap();

        assert_eq!(ship.len(), 9);
        assert_eq!(&ship[..8], &RESOLVE_MARKET_DISCRIMINATOR);
        assert_eq!(ship[8], 0);
        assert_eq!(slip[8], 1);
    }

    #[test]
    fn test_create_market_payload() {
        let data = encode_create_market("a/b", 42, -5).unwrap();

        let mut expected = CREATE_MARKET_DISCRIMINATOR.to_vec();
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(b"a/b");
        expected.extend_from_slice(&42u64.to_le_bytes());
        expected.extend_from_slice(&(-5i64).to_le_bytes());
        assert_eq!(data, expected);
    }

    #[test]
    fn test_place_bet_and_claim_payloads() {
        let data = encode_place_bet(Side::Slip, 1_500_000_000).unwrap();
        assert_eq!(&data[..8], &PLACE_BET_DISCRIMINATOR);
        assert_eq!(data[8], 1);
        assert_eq!(&data[9..], &1_500_000_000u64.to_le_bytes());

        assert_eq!(encode_claim(), CLAIM_WINNINGS_DISCRIMINATOR.to_vec());
    }

    #[test]
    fn test_market_key_matches_stored_bytes() {
        let market = sample_market();
        let data = encode_market_account(&market).unwrap();
        let key = encode_market_key(&market.repo, market.pr_number).unwrap();

        assert_eq!(key.len(), 4 + market.repo.len() + 8);
        assert_eq!(&data[MARKET_REPO_OFFSET..MARKET_REPO_OFFSET + key.len()], key.as_slice());
        assert_ne!(key, encode_market_key(&market.repo, market.pr_number + 1).unwrap());
    }
}
