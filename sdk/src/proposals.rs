//! Proposal and vote account discovery
//!
//! Both enumerations walk a counter kept in the global record and fetch every derived account
//! concurrently. Individual misses or failures are logged and dropped.

use crate::{
    core::Result,
    reader::StateReader,
    state::ValidatorProposal,
};
use futures::future::join_all;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

/// A proposal together with its index and address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalEntry {
    pub index: u32,
    pub address: Pubkey,
    pub proposal: ValidatorProposal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Open,
    Closed {
        finalized_at: u32,
        winner: Option<Pubkey>,
    },
}

impl ProposalEntry {
    pub fn status(&self) -> ProposalStatus {
        match self.proposal.date_finalized {
            None => ProposalStatus::Open,
            Some(finalized_at) => ProposalStatus::Closed {
                finalized_at,
                winner: self.proposal.winner,
            },
        }
    }
}

/// Proposals discovered under the global counter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalSet {
    /// Ordered by index
    pub entries: Vec<ProposalEntry>,
}

impl ProposalSet {
    /// The highest-indexed proposal that has not been finalized
    pub fn open(&self) -> Option<&ProposalEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.proposal.is_open())
    }

    /// The open proposal, or else the most recently created one
    pub fn default_selection(&self) -> Option<&ProposalEntry> {
        self.open().or_else(|| {
            self.entries
                .iter()
                .max_by_key(|entry| (entry.proposal.date_created, entry.index))
        })
    }
}

/// Fetch proposals `0..count`, dropping any that are missing or unreadable
pub async fn discover_proposals(reader: &StateReader, count: u32) -> Result<ProposalSet> {
    let pdas = reader.pdas();
    let addresses = (0..count)
        .map(|index| Ok((index, pdas.proposal(index)?)))
        .collect::<Result<Vec<_>>>()?;

    let fetches = addresses.iter().map(|(index, address)| async move {
        let fetched = reader.try_fetch::<ValidatorProposal>(address).await;
        (*index, *address, fetched)
    });

    let mut entries = Vec::with_capacity(addresses.len());
    for (index, address, fetched) in join_all(fetches).await {
        match fetched {
            Ok(Some(proposal)) => entries.push(ProposalEntry {
                index,
                address,
                proposal,
            }),
            Ok(None) => warn!("Proposal {} ({}) not created yet", index, address),
            Err(e) => warn!("Skipping proposal {} ({}): {}", index, address, e),
        }
    }

    Ok(ProposalSet { entries })
}

/// A program-created vote account and the validator bound to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteAccountEntry {
    pub vote_account: Pubkey,
    pub validator_id: Pubkey,
}

/// Vote accounts `0..count`, newest first, skipping any without readable vote data
pub async fn discover_vote_accounts(reader: &StateReader, count: u32) -> Result<Vec<VoteAccountEntry>> {
    let pdas = reader.pdas();
    let vote_accounts = (0..count)
        .rev()
        .map(|index| pdas.vote_account(index))
        .collect::<Result<Vec<_>>>()?;

    let fetches = vote_accounts.iter().map(|vote_account| async move {
        (*vote_account, reader.try_vote_data(vote_account).await)
    });

    let mut entries = Vec::new();
    for (vote_account, fetched) in join_all(fetches).await {
        match fetched {
            Ok(Some(data)) => entries.push(VoteAccountEntry {
                vote_account,
                validator_id: data.validator_id,
            }),
            Ok(None) => {}
            Err(e) => warn!("Skipping vote account {}: {}", vote_account, e),
        }
    }
    Ok(entries)
}
