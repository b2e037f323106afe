//! Ingl SDK - client-side protocol layer for the Ingl validator program
//!
//! This SDK provides:
//! - Deterministic derivation of every program-derived address
//! - Borsh codecs for the program's account records and instruction payloads
//! - Instruction builders with the account orderings the program expects
//! - Transaction assembly, wallet signing, submission and confirmation
//! - Reward accrual and proposal discovery over live ledger state
//!
//! [`InglClient`] ties these together for user-facing operations.

pub mod client;
pub mod codec;
pub mod constants;
pub mod core;
pub mod instruction;
pub mod pda;
pub mod proposals;
pub mod reader;
pub mod rewards;
pub mod rpc;
pub mod state;
pub mod submit;
pub mod validators;
pub mod wallet;

// Re-export key types
pub use client::{InglClient, MintedGem, RarityImprint};
pub use codec::AccountRecord;
pub use crate::core::{ClientConfig, ErrorKind, InglError, OperationContext, ProgramErrorCode, Result};
pub use pda::PdaDeriver;
pub use proposals::{ProposalEntry, ProposalSet, ProposalStatus, VoteAccountEntry};
pub use reader::{Gem, StateReader};
pub use rewards::GemReward;
pub use rpc::{LedgerRpc, SolanaLedger, TokenHolding};
pub use state::{
    Class, FundsState, GemAccount, GlobalGems, Rarity, RarityPhase, ValidatorProposal,
    VoteAccountData,
};
pub use wallet::{KeypairWallet, WalletAdapter, WalletStatus};
