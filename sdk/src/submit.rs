//! Transaction assembly, signing, submission and confirmation

use crate::{
    core::{InglError, Result},
    rpc::LedgerRpc,
    wallet::{connected_key, WalletAdapter},
};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// Instructions to submit together, with any ephemeral signers they need
pub struct TransactionRequest {
    description: &'static str,
    instructions: Vec<Instruction>,
    signers: Vec<Keypair>,
    compute_units: Option<u32>,
}

impl TransactionRequest {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            instructions: Vec::new(),
            signers: Vec::new(),
            compute_units: None,
        }
    }

    pub fn add_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Sign with a keypair generated for this transaction, such as a new mint
    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.signers.push(signer);
        self
    }

    /// Set compute unit limit
    pub fn with_compute_units(mut self, units: u32) -> Self {
        self.compute_units = Some(units);
        self
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Final instruction list, with the compute budget request first
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut instructions = Vec::with_capacity(self.instructions.len() + 1);
        if let Some(units) = self.compute_units {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(units));
        }
        instructions.extend(self.instructions.iter().cloned());
        instructions
    }
}

/// Signs and sends transactions on behalf of a wallet
#[derive(Clone)]
pub struct TransactionSubmitter {
    rpc: Arc<dyn LedgerRpc>,
    wallet: Arc<dyn WalletAdapter>,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, wallet: Arc<dyn WalletAdapter>, poll_interval: Duration) -> Self {
        Self {
            rpc,
            wallet,
            poll_interval,
        }
    }

    /// Build, sign, send and confirm `request`
    ///
    /// Nothing is retried. An expired blockhash is reported as
    /// [`InglError::BlockhashExpired`], a program failure as [`InglError::Rejected`].
    pub async fn submit(&self, request: TransactionRequest) -> Result<Signature> {
        let payer = connected_key(self.wallet.as_ref())?;
        info!("Submitting transaction: {}", request.description());

        let instructions = request.instructions();
        let (blockhash, last_valid_block_height) = self.rpc.get_latest_blockhash().await?;
        debug!(
            "Using blockhash {} valid until height {}",
            blockhash, last_valid_block_height
        );

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&payer));
        transaction.message.recent_blockhash = blockhash;

        if !request.signers.is_empty() {
            let signers: Vec<&Keypair> = request.signers.iter().collect();
            transaction
                .try_partial_sign(&signers, blockhash)
                .map_err(|e| {
                    InglError::invalid_state(format!(
                        "ephemeral signer {} rejected: {e}",
                        signers.iter().map(|s| s.pubkey().to_string()).collect::<Vec<_>>().join(", ")
                    ))
                })?;
        }

        let transaction = self.wallet.sign_transaction(transaction).await?;
        if !transaction.is_signed() {
            return Err(InglError::SigningRefused(
                "wallet returned an incompletely signed transaction".to_string(),
            ));
        }

        let signature = self.rpc.send_transaction(&transaction).await?;
        debug!("Sent transaction {}", signature);

        self.confirm(signature, last_valid_block_height).await?;
        info!("Confirmed {}: {}", request.description(), signature);
        Ok(signature)
    }

    /// Poll until the signature lands or its blockhash can no longer be included
    pub async fn confirm(&self, signature: Signature, last_valid_block_height: u64) -> Result<()> {
        loop {
            match self.rpc.get_signature_status(&signature).await? {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => return Err(InglError::Rejected(err)),
                None => {}
            }

            if self.rpc.get_block_height().await? > last_valid_block_height {
                // the transaction may have landed in the slot that crossed the height
                return match self.rpc.get_signature_status(&signature).await? {
                    Some(Ok(())) => Ok(()),
                    Some(Err(err)) => Err(InglError::Rejected(err)),
                    None => Err(InglError::BlockhashExpired { signature }),
                };
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::ErrorKind,
        rpc::MockLedgerRpc,
        wallet::KeypairWallet,
    };
    use mockall::predicate::*;
    use solana_sdk::{
        hash::Hash, instruction::InstructionError, pubkey::Pubkey, system_instruction,
        transaction::TransactionError,
    };

    fn transfer_request(payer: &Pubkey) -> TransactionRequest {
        TransactionRequest::new("transfer")
            .add_instruction(system_instruction::transfer(payer, &Pubkey::new_unique(), 1))
    }

    fn submitter(rpc: MockLedgerRpc, keypair: Keypair) -> TransactionSubmitter {
        TransactionSubmitter::new(
            Arc::new(rpc),
            Arc::new(KeypairWallet::new(keypair)),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_compute_budget_goes_first() {
        let payer = Pubkey::new_unique();
        let request = transfer_request(&payer).with_compute_units(400_000);
        let instructions = request.instructions();

        assert_eq!(instructions.len(), 2);
        assert_eq!(
            instructions[0],
            ComputeBudgetInstruction::set_compute_unit_limit(400_000)
        );
    }

    #[tokio::test]
    async fn test_submit_confirms() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();

        let mut rpc = MockLedgerRpc::new();
        rpc.expect_get_latest_blockhash()
            .times(1)
            .returning(|| Ok((Hash::new_unique(), 100)));
        rpc.expect_send_transaction()
            .times(1)
            .returning(|tx| {
                assert!(tx.is_signed());
                Ok(tx.signatures[0])
            });
        rpc.expect_get_signature_status()
            .times(1)
            .returning(|_| Ok(Some(Ok(()))));

        let signature = submitter(rpc, keypair)
            .submit(transfer_request(&payer))
            .await
            .unwrap();
        assert_ne!(signature, Signature::default());
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();

        let mut rpc = MockLedgerRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok((Hash::new_unique(), 100)));
        rpc.expect_send_transaction()
            .returning(|tx| Ok(tx.signatures[0]));
        rpc.expect_get_signature_status().returning(|_| {
            Ok(Some(Err(TransactionError::InstructionError(
                0,
                InstructionError::Custom(5),
            ))))
        });

        let err = submitter(rpc, keypair)
            .submit(transfer_request(&payer))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_blockhash_is_distinct_from_rejection() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();

        let mut rpc = MockLedgerRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok((Hash::new_unique(), 100)));
        rpc.expect_send_transaction()
            .returning(|tx| Ok(tx.signatures[0]));
        rpc.expect_get_signature_status().returning(|_| Ok(None));

        let mut height = 98;
        rpc.expect_get_block_height().returning(move || {
            height += 1;
            Ok(height)
        });

        let err = submitter(rpc, keypair)
            .submit(transfer_request(&payer))
            .await
            .unwrap_err();
        assert!(matches!(err, InglError::BlockhashExpired { .. }));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_missing_ephemeral_signer_never_reaches_wallet() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();
        let mint = Keypair::new();

        let mut rpc = MockLedgerRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok((Hash::new_unique(), 100)));
        rpc.expect_send_transaction().never();

        // the mint signs but is not referenced by the instruction
        let request = transfer_request(&payer).with_signer(mint);
        let err = submitter(rpc, keypair).submit(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_confirm_polls_until_landed() {
        let mut rpc = MockLedgerRpc::new();
        let mut polls = 0;
        rpc.expect_get_signature_status()
            .with(always())
            .returning(move |_| {
                polls += 1;
                Ok(if polls < 3 { None } else { Some(Ok(())) })
            });
        rpc.expect_get_block_height().times(2).returning(|| Ok(10));

        submitter(rpc, Keypair::new())
            .confirm(Signature::default(), 50)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_landing_at_expiry_height_is_confirmed() {
        let mut rpc = MockLedgerRpc::new();
        let mut polls = 0;
        rpc.expect_get_signature_status().times(2).returning(move |_| {
            polls += 1;
            Ok(if polls < 2 { None } else { Some(Ok(())) })
        });
        rpc.expect_get_block_height().times(1).returning(|| Ok(101));

        submitter(rpc, Keypair::new())
            .confirm(Signature::default(), 100)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejection_at_expiry_height_is_not_expiry() {
        let mut rpc = MockLedgerRpc::new();
        let mut polls = 0;
        rpc.expect_get_signature_status().times(2).returning(move |_| {
            polls += 1;
            Ok(if polls < 2 {
                None
            } else {
                Some(Err(TransactionError::InstructionError(
                    0,
                    InstructionError::Custom(4),
                )))
            })
        });
        rpc.expect_get_block_height().returning(|| Ok(101));

        let err = submitter(rpc, Keypair::new())
            .confirm(Signature::default(), 100)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejection);
    }
}
