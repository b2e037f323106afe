//! Network accessor seam
//!
//! [`LedgerRpc`] is the small slice of the JSON-RPC surface this crate needs. [`SolanaLedger`]
//! implements it over the nonblocking `RpcClient`; tests substitute their own ledgers.

use crate::core::{InglError, Result};
use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use tracing::debug;

/// Offset of the owner field inside an SPL token account
const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;

/// A token account owned by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolding {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// Outcome of a processed signature, `None` while still unknown to the cluster
pub type SignatureStatus = Option<std::result::Result<(), TransactionError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Raw account bytes, `None` when the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Token accounts owned by `owner`
    async fn get_token_holdings(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>>;

    /// Latest blockhash and the last block height at which it is valid
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)>;

    async fn get_block_height(&self) -> Result<u64>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus>;
}

/// [`LedgerRpc`] over a Solana JSON-RPC endpoint
#[derive(Clone)]
pub struct SolanaLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaLedger {
    pub fn new(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url.to_string(), commitment)),
            commitment,
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_token_holdings(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(spl_token::state::Account::LEN as u64),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    TOKEN_ACCOUNT_OWNER_OFFSET,
                    owner.as_ref(),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(&spl_token::id(), config)
            .await?;
        debug!("Found {} token accounts for {}", accounts.len(), owner);

        accounts
            .into_iter()
            .map(|(address, account)| {
                let token = spl_token::state::Account::unpack(&account.data)
                    .map_err(|e| InglError::decode("token account", e))?;
                Ok(TokenHolding {
                    address,
                    mint: token.mint,
                    amount: token.amount,
                })
            })
            .collect()
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok(self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?)
    }

    async fn get_block_height(&self) -> Result<u64> {
        Ok(self
            .client
            .get_block_height_with_commitment(self.commitment)
            .await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        Ok(self.client.send_transaction(transaction).await?)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus> {
        Ok(self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await?)
    }
}
