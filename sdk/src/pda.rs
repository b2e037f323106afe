//! Program-derived address helpers for the Ingl program
//!
//! Every account the program owns is addressed by a fixed seed string, optionally followed by a
//! key or a big-endian `u32` index. The named methods on [`PdaDeriver`] are the only way the rest
//! of the crate builds these addresses.

use crate::{
    constants::*,
    core::{InglError, Result},
};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

/// Derive a program address, reporting a seed/program mismatch as a derivation error
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or_else(|| InglError::Derivation {
        seeds: describe_seeds(seeds),
        program_id: *program_id,
    })
}

fn describe_seeds(seeds: &[&[u8]]) -> String {
    seeds
        .iter()
        .map(|seed| match std::str::from_utf8(seed) {
            Ok(text) if !text.is_empty() && text.chars().all(|c| c.is_ascii_graphic()) => {
                text.to_string()
            }
            _ => format!("0x{}", seed.iter().map(|b| format!("{b:02x}")).collect::<String>()),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Named address derivations for one deployment of the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdaDeriver {
    program_id: Pubkey,
}

impl PdaDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    fn address(&self, seeds: &[&[u8]]) -> Result<Pubkey> {
        let (address, bump) = derive(seeds, &self.program_id)?;
        debug!("Derived {} (bump {}) from {}", address, bump, describe_seeds(seeds));
        Ok(address)
    }

    /// Pool holding the lamports of freshly minted gems
    pub fn minting_pool(&self) -> Result<Pubkey> {
        self.address(&[MINTING_POOL_SEED])
    }

    pub fn mint_authority(&self) -> Result<Pubkey> {
        self.address(&[MINT_AUTHORITY_SEED])
    }

    /// Global counters account
    pub fn global_gems(&self) -> Result<Pubkey> {
        self.address(&[GLOBAL_GEMS_SEED])
    }

    /// Gem record for a gem mint
    pub fn gem_account(&self, mint: &Pubkey) -> Result<Pubkey> {
        self.address(&[GEM_ACCOUNT_SEED, mint.as_ref()])
    }

    /// Pending-delegation pool
    pub fn pd_pool(&self) -> Result<Pubkey> {
        self.address(&[PD_POOL_SEED])
    }

    /// Proposal number `index`, seeded with its big-endian bytes
    pub fn proposal(&self, index: u32) -> Result<Pubkey> {
        self.address(&[PROPOSAL_SEED, &index.to_be_bytes()])
    }

    /// Vote account number `index` created by the program
    pub fn vote_account(&self, index: u32) -> Result<Pubkey> {
        self.address(&[VOTE_ACCOUNT_SEED, &index.to_be_bytes()])
    }

    /// Ingl bookkeeping for a vote account
    pub fn vote_data(&self, vote_account: &Pubkey) -> Result<Pubkey> {
        self.address(&[VOTE_DATA_SEED, vote_account.as_ref()])
    }

    pub fn treasury(&self) -> Result<Pubkey> {
        self.address(&[TREASURY_SEED])
    }

    pub fn authorized_withdrawer(&self) -> Result<Pubkey> {
        self.address(&[AUTHORIZED_WITHDRAWER_SEED])
    }

    pub fn collection_mint(&self) -> Result<Pubkey> {
        self.address(&[COLLECTION_SEED])
    }

    pub fn collection_holder(&self) -> Result<Pubkey> {
        self.address(&[COLLECTION_HOLDER_SEED])
    }

    pub fn council_mint(&self) -> Result<Pubkey> {
        self.address(&[COUNCIL_MINT_SEED])
    }

    pub fn council_mint_authority(&self) -> Result<Pubkey> {
        self.address(&[COUNCIL_MINT_AUTHORITY_SEED])
    }

    pub fn stake_account(&self, vote_account: &Pubkey) -> Result<Pubkey> {
        self.address(&[STAKE_ACCOUNT_SEED, vote_account.as_ref()])
    }

    pub fn validator_treasury(&self, vote_account: &Pubkey) -> Result<Pubkey> {
        self.address(&[VALIDATOR_TREASURY_SEED, vote_account.as_ref()])
    }
}

// ================================
// Metaplex and token addresses
// ================================

/// Metaplex metadata account for a mint
pub fn metadata_account(mint: &Pubkey) -> Result<Pubkey> {
    let (address, _) = derive(
        &[METADATA_SEED, METAPLEX_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METAPLEX_PROGRAM_ID,
    )?;
    Ok(address)
}

/// Metaplex master edition account for a mint
pub fn edition_account(mint: &Pubkey) -> Result<Pubkey> {
    let (address, _) = derive(
        &[
            METADATA_SEED,
            METAPLEX_PROGRAM_ID.as_ref(),
            mint.as_ref(),
            EDITION_SEED,
        ],
        &METAPLEX_PROGRAM_ID,
    )?;
    Ok(address)
}

/// Associated token account of `owner` for `mint`
pub fn token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
