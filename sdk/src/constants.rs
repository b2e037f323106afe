//! Wire constants shared with the on-chain Ingl program
//!
//! Seed strings, validation phrases, well-known program ids and the reward split.
//! Every value here is part of the contract with the deployed program.

use solana_sdk::{pubkey, pubkey::Pubkey};

// ================================
// Program IDs
// ================================

/// Ingl program id used by the reference deployment
pub const INGL_PROGRAM_ID: Pubkey = pubkey!("6rdpYzThSFYtEa9bSJYGemkN2MSNU8JWh1SNT67YZJ1v");

/// Metaplex token-metadata program
pub const METAPLEX_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

pub const STAKE_PROGRAM_ID: Pubkey = pubkey!("Stake11111111111111111111111111111111111111");
pub const STAKE_CONFIG_ID: Pubkey = pubkey!("StakeConfig11111111111111111111111111111111");

// Pyth price accounts read while revealing rarity
pub const BTC_PRICE_FEED: Pubkey = pubkey!("9ATrvi6epR5hVYtwNs7BB7VCiYnd4WM7e8MfafWpfiXC");
pub const SOL_PRICE_FEED: Pubkey = pubkey!("7LLvRhMs73FqcLkA8jvEE1AM2mYZXTmqfUv8GAEurymx");
pub const ETH_PRICE_FEED: Pubkey = pubkey!("6fhxFvPocWapZ5Wa2miDnrX2jYRFKvFqYnX11GGkBo2f");
pub const BNB_PRICE_FEED: Pubkey = pubkey!("DR6PqK15tD21MEGSLmDpXwLA7Fw47kwtdZeUMdT7vd7L");

// ================================
// PDA Seeds
// ================================

pub const TREASURY_SEED: &[u8] = b"ingl_treasury_account_key";
pub const COLLECTION_SEED: &[u8] = b"ingl_nft_collection_newer";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_authority";
pub const MINTING_POOL_SEED: &[u8] = b"minting_pool";
pub const COLLECTION_HOLDER_SEED: &[u8] = b"collection_holder";
pub const GLOBAL_GEMS_SEED: &[u8] = b"global_gem_account";
pub const GEM_ACCOUNT_SEED: &[u8] = b"gem_account";
pub const PD_POOL_SEED: &[u8] = b"pd_pool";
pub const PROPOSAL_SEED: &[u8] = b"ingl_proposals";
pub const COUNCIL_MINT_SEED: &[u8] = b"council_mint";
pub const COUNCIL_MINT_AUTHORITY_SEED: &[u8] = b"council_mint_authority";
pub const AUTHORIZED_WITHDRAWER_SEED: &[u8] = b"InglAuthorizedWithdrawer";
pub const VOTE_ACCOUNT_SEED: &[u8] = b"InglVote";
pub const VOTE_DATA_SEED: &[u8] = b"InglVoteData";
pub const STAKE_ACCOUNT_SEED: &[u8] = b"staking_account_key";
pub const VALIDATOR_TREASURY_SEED: &[u8] = b"Treasury_account_key";

// Metaplex PDA seeds
pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";

// ================================
// Validation Phrases
// ================================

/// Marker values the program writes at the start of each record
pub mod validation_phrase {
    pub const VALIDATOR_PROPOSAL: u32 = 842_542_964;
    pub const GLOBAL_GEMS: u32 = 546_875_215;
    pub const VALIDATOR_VOTE: u32 = 214_648_321;
    pub const VOTE_ACCOUNT_DATA: u32 = 842_154_348;
    pub const GEM_ACCOUNT: u32 = 516_248_961;
    pub const VOTE_REWARDS: u32 = 584_625_418;
}

// ================================
// Economics
// ================================

pub const VALIDATOR_ID_SHARE: u64 = 15;
pub const TREASURY_SHARE: u64 = 13;
pub const TEAM_SHARE: u64 = 12;
/// Percentage of each epoch reward distributed to gem holders
pub const NFTS_SHARE: u64 = 60;

/// Seconds between seeding and revealing a gem's rarity
pub const RARITY_REVEAL_COOLDOWN_SECS: u64 = 20;

pub const MINT_COMPUTE_UNITS: u32 = 240_000;
pub const CLAIM_COMPUTE_UNITS: u32 = 400_000;
