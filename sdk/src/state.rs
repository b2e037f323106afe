//! On-chain record layouts of the Ingl program
//!
//! Field order, widths and enum variant order mirror the program's borsh layouts exactly;
//! decoding and validation live in [`crate::codec`].

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use std::{fmt, str::FromStr};

// ================================
// Gem Classes and Rarity
// ================================

/// Value tier chosen when a gem is minted
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Ruby,
    Diamond,
    Sapphire,
    Emerald,
    Serendibite,
    Benitoite,
}

impl Class {
    pub const ALL: [Class; 6] = [
        Class::Ruby,
        Class::Diamond,
        Class::Sapphire,
        Class::Emerald,
        Class::Serendibite,
        Class::Benitoite,
    ];

    /// Value weight in whole SOL
    pub fn weight(self) -> u64 {
        match self {
            Class::Ruby => 500,
            Class::Diamond => 100,
            Class::Sapphire => 50,
            Class::Emerald => 10,
            Class::Serendibite => 5,
            Class::Benitoite => 1,
        }
    }

    /// Mint price in lamports
    pub fn lamports(self) -> u64 {
        self.weight() * LAMPORTS_PER_SOL
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Class {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Class::ALL
            .into_iter()
            .find(|class| class.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown gem class: {s}"))
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Exalted,
    Mythic,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ================================
// Funds Location
// ================================

/// Where the lamports backing a gem currently sit
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsLocation {
    /// Unassigned, still in the minting pool
    MintingPool,
    /// Allocated to the pending-delegation pool
    PdPool,
    /// Delegated to a validator vote account
    VoteAccount { vote_account_id: Pubkey },
}

// ================================
// Records
// ================================

/// Aggregate counters kept by the program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct GlobalGems {
    pub validation_phrase: u32,
    pub counter: u32,
    pub total_raised: u64,
    pub pd_pool_total: u64,
    pub delegated_total: u64,
    pub dealloced_total: u64,
    pub is_proposal_ongoing: bool,
    pub proposal_numeration: u32,
    pub pending_delegation_total: u64,
    pub validator_list: Vec<Pubkey>,
}

/// One gem's participation in one proposal
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorVote {
    pub validation_phrase: u32,
    pub proposal_id: Pubkey,
    pub validator_index: u32,
}

/// Leading tag of a gem record
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemAccountVersion {
    V0_0_1,
    BlankCase,
}

impl GemAccountVersion {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Gem record, version 0.0.1
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct GemAccount {
    pub struct_id: GemAccountVersion,
    pub validation_phrase: u32,
    pub date_created: u32,
    pub class: Class,
    pub redeemable_date: u32,
    pub numeration: u32,
    pub rarity: Option<Rarity>,
    pub funds_location: FundsLocation,
    pub rarity_seed_time: Option<u32>,
    pub date_allocated: Option<u32>,
    pub last_voted_proposal: Option<Pubkey>,
    pub last_withdrawal_epoch: Option<u64>,
    pub last_delegation_epoch: Option<u64>,
    pub all_withdraws: Vec<u64>,
    pub all_votes: Vec<ValidatorVote>,
}

/// Validator selection proposal
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorProposal {
    pub validation_phrase: u32,
    pub validator_ids: Vec<Pubkey>,
    pub date_created: u32,
    pub date_finalized: Option<u32>,
    pub votes: Vec<u32>,
    pub winner: Option<Pubkey>,
}

/// Reward ledger entry for one epoch
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteRewards {
    pub validation_phrase: u32,
    pub epoch_number: u64,
    pub total_reward: u64,
    pub total_stake: u64,
}

/// Ingl bookkeeping attached to a vote account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteAccountData {
    pub validation_phrase: u32,
    pub total_delegated: u64,
    pub last_withdraw_epoch: u64,
    pub dealloced: u64,
    pub pending_validator_rewards: Option<u64>,
    pub validator_id: Pubkey,
    pub pending_delegation_total: u64,
    pub vote_rewards: Vec<VoteRewards>,
}

/// Arguments the program passes to the vote program when creating a vote account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteInit {
    pub node_pubkey: Pubkey,
    pub authorized_voter: Pubkey,
    pub authorized_withdrawer: Pubkey,
    pub commission: u8,
}

// ================================
// Gem lifecycle helpers
// ================================

/// Mutually exclusive funds states of a gem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsState {
    Unassigned,
    Allocated,
    Delegated(Pubkey),
}

/// Progress of the two-phase rarity handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RarityPhase {
    Unseeded,
    Seeded { reveal_at: u32 },
    Revealed(Rarity),
}

impl GemAccount {
    pub fn funds_state(&self) -> FundsState {
        match self.funds_location {
            FundsLocation::MintingPool => FundsState::Unassigned,
            FundsLocation::PdPool => FundsState::Allocated,
            FundsLocation::VoteAccount { vote_account_id } => FundsState::Delegated(vote_account_id),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self.funds_state(), FundsState::Unassigned)
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self.funds_state(), FundsState::Allocated)
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self.funds_state(), FundsState::Delegated(_))
    }

    pub fn delegated_vote_account(&self) -> Option<Pubkey> {
        match self.funds_location {
            FundsLocation::VoteAccount { vote_account_id } => Some(vote_account_id),
            _ => None,
        }
    }

    /// A rarity is only meaningful once the seed time has been recorded
    pub fn rarity_phase(&self) -> RarityPhase {
        match (self.rarity_seed_time, self.rarity) {
            (Some(_), Some(rarity)) => RarityPhase::Revealed(rarity),
            (Some(reveal_at), None) => RarityPhase::Seeded { reveal_at },
            (None, _) => RarityPhase::Unseeded,
        }
    }

    /// Redeeming needs the funds back in the minting pool and the lock period over
    pub fn can_redeem(&self, now: u32) -> bool {
        self.is_unassigned() && now >= self.redeemable_date
    }

    pub fn can_deallocate(&self, now: u32) -> bool {
        self.is_allocated() && now >= self.redeemable_date
    }

    pub fn has_voted_on(&self, proposal: &Pubkey) -> bool {
        self.all_votes.iter().any(|vote| vote.proposal_id == *proposal)
    }

    /// Epoch up to which rewards have already been settled
    pub fn checkpoint_epoch(&self) -> Option<u64> {
        self.last_withdrawal_epoch.max(self.last_delegation_epoch)
    }
}

impl ValidatorProposal {
    pub fn is_open(&self) -> bool {
        self.date_finalized.is_none()
    }
}

impl GlobalGems {
    pub fn total_raised_sol(&self) -> f64 {
        self.total_raised as f64 / LAMPORTS_PER_SOL as f64
    }

    pub fn delegated_total_sol(&self) -> f64 {
        self.delegated_total as f64 / LAMPORTS_PER_SOL as f64
    }

    pub fn pd_pool_total_sol(&self) -> f64 {
        self.pd_pool_total as f64 / LAMPORTS_PER_SOL as f64
    }
}
