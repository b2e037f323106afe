//! Typed reads of program state
//!
//! Each read is an independent snapshot; nothing here caches or assumes that two reads observe
//! the same ledger state.

use crate::{
    codec::AccountRecord,
    core::{InglError, Result},
    pda::PdaDeriver,
    rpc::LedgerRpc,
    state::{GemAccount, GlobalGems, ValidatorProposal, VoteAccountData},
};
use futures::future::join_all;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

/// A decoded gem together with the addresses that identify it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gem {
    pub mint: Pubkey,
    pub address: Pubkey,
    pub account: GemAccount,
}

#[derive(Clone)]
pub struct StateReader {
    rpc: Arc<dyn LedgerRpc>,
    pdas: PdaDeriver,
}

impl StateReader {
    pub fn new(rpc: Arc<dyn LedgerRpc>, pdas: PdaDeriver) -> Self {
        Self { rpc, pdas }
    }

    pub fn pdas(&self) -> &PdaDeriver {
        &self.pdas
    }

    /// Fetch and decode a record, `None` if the account does not exist
    pub async fn try_fetch<T: AccountRecord>(&self, address: &Pubkey) -> Result<Option<T>> {
        match self.rpc.get_account_data(address).await? {
            Some(data) => {
                debug!("Decoding {} from {} ({} bytes)", T::NAME, address, data.len());
                T::decode(&data).map(Some)
            }
            None => Ok(None),
        }
    }

    pub async fn fetch<T: AccountRecord>(&self, address: &Pubkey) -> Result<T> {
        self.try_fetch(address)
            .await?
            .ok_or(InglError::AccountNotFound(*address))
    }

    pub async fn global_gems(&self) -> Result<GlobalGems> {
        self.fetch(&self.pdas.global_gems()?).await
    }

    pub async fn try_gem(&self, mint: &Pubkey) -> Result<Option<Gem>> {
        let address = self.pdas.gem_account(mint)?;
        Ok(self
            .try_fetch::<GemAccount>(&address)
            .await?
            .map(|account| Gem {
                mint: *mint,
                address,
                account,
            }))
    }

    pub async fn gem(&self, mint: &Pubkey) -> Result<Gem> {
        let address = self.pdas.gem_account(mint)?;
        let account = self.fetch::<GemAccount>(&address).await?;
        Ok(Gem {
            mint: *mint,
            address,
            account,
        })
    }

    pub async fn vote_data(&self, vote_account: &Pubkey) -> Result<VoteAccountData> {
        self.fetch(&self.pdas.vote_data(vote_account)?).await
    }

    pub async fn try_vote_data(&self, vote_account: &Pubkey) -> Result<Option<VoteAccountData>> {
        self.try_fetch(&self.pdas.vote_data(vote_account)?).await
    }

    pub async fn proposal(&self, index: u32) -> Result<Option<ValidatorProposal>> {
        self.try_fetch(&self.pdas.proposal(index)?).await
    }

    /// Gems held by `owner`
    ///
    /// Token accounts whose mint has no gem record are not gems and are skipped. A gem record
    /// that fails to decode is an error.
    pub async fn owned_gems(&self, owner: &Pubkey) -> Result<Vec<Gem>> {
        let holdings = self.rpc.get_token_holdings(owner).await?;
        let mints: Vec<Pubkey> = holdings
            .into_iter()
            .filter(|holding| holding.amount == 1)
            .map(|holding| holding.mint)
            .collect();
        debug!("Checking {} candidate gem mints for {}", mints.len(), owner);

        let lookups = join_all(mints.iter().map(|mint| self.try_gem(mint))).await;

        let mut gems = Vec::new();
        for lookup in lookups {
            if let Some(gem) = lookup? {
                gems.push(gem);
            }
        }
        gems.sort_by_key(|gem| gem.account.numeration);
        Ok(gems)
    }
}
