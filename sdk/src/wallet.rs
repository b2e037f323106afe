//! Wallet capability seam
//!
//! Key management stays outside this crate. Operations only need a public key, a connection
//! status and the ability to ask for signatures, which the wallet may refuse.

use crate::core::{InglError, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStatus {
    Connected,
    Connecting,
    Disconnecting,
    Disconnected,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Connected => write!(f, "connected"),
            WalletStatus::Connecting => write!(f, "connecting"),
            WalletStatus::Disconnecting => write!(f, "disconnecting"),
            WalletStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn public_key(&self) -> Option<Pubkey>;

    fn status(&self) -> WalletStatus;

    /// Sign with the wallet's key; other required signatures must already be present
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature>;
}

/// Public key of a connected wallet, checked before any network access
pub fn connected_key(wallet: &dyn WalletAdapter) -> Result<Pubkey> {
    match (wallet.status(), wallet.public_key()) {
        (WalletStatus::Connected, Some(key)) => Ok(key),
        _ => Err(InglError::WalletNotConnected),
    }
}

/// Wallet backed by a local keypair, as used by the CLI
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn public_key(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    fn status(&self) -> WalletStatus {
        WalletStatus::Connected
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| InglError::SigningRefused(e.to_string()))?;
        Ok(transaction)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        Ok(self.keypair.sign_message(message))
    }
}
