//! High-level client for the Ingl program
//!
//! [`InglClient`] is the surface the UI and the CLI call. Every operation checks the wallet
//! before touching the network, derives its own addresses, reads fresh snapshots where it has to
//! branch on state, and wraps any failure as `failed to <operation> with error: <cause>`.

use crate::{
    constants::{CLAIM_COMPUTE_UNITS, MINT_COMPUTE_UNITS},
    core::{ClientConfig, InglError, OperationContext, Result},
    instruction::{self, ClaimGroup},
    pda::PdaDeriver,
    proposals::{discover_proposals, discover_vote_accounts, ProposalSet, VoteAccountEntry},
    reader::{Gem, StateReader},
    rewards::{rewards_for, GemReward},
    rpc::{LedgerRpc, SolanaLedger},
    state::{Class, GlobalGems, Rarity, RarityPhase, ValidatorProposal, VoteAccountData},
    submit::{TransactionRequest, TransactionSubmitter},
    validators::{enrich, EnrichedValidator, ValidatorFeed},
    wallet::{connected_key, WalletAdapter},
};
use futures::future::{join_all, try_join_all};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use tracing::{info, warn};

/// Result of minting a gem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintedGem {
    pub mint: Pubkey,
    pub signature: Signature,
}

/// Transactions sent while imprinting rarity and the rarity observed afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RarityImprint {
    pub seed_signature: Option<Signature>,
    pub reveal_signature: Option<Signature>,
    pub rarity: Option<Rarity>,
}

/// Current unix time in seconds, as the program stores it
pub fn unix_timestamp() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Run an operation, logging and wrapping its failure
async fn run<T, F>(operation: &'static str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let result = future.await;
    if let Err(e) = &result {
        warn!("Failed to {}: {}", operation, e);
    }
    result.during(operation)
}

pub struct InglClient {
    config: ClientConfig,
    pdas: PdaDeriver,
    wallet: Arc<dyn WalletAdapter>,
    reader: StateReader,
    submitter: TransactionSubmitter,
}

impl InglClient {
    pub fn new(config: ClientConfig, rpc: Arc<dyn LedgerRpc>, wallet: Arc<dyn WalletAdapter>) -> Self {
        let pdas = PdaDeriver::new(config.program_id);
        let reader = StateReader::new(rpc.clone(), pdas);
        let submitter = TransactionSubmitter::new(rpc, wallet.clone(), config.confirm_poll_interval);

        Self {
            config,
            pdas,
            wallet,
            reader,
            submitter,
        }
    }

    /// Client talking to `config.rpc_url`
    pub fn connect(config: ClientConfig, wallet: Arc<dyn WalletAdapter>) -> Self {
        let rpc = Arc::new(SolanaLedger::new(&config.rpc_url, config.commitment));
        info!("Connecting to {} (program {})", config.rpc_url, config.program_id);
        Self::new(config, rpc, wallet)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pdas(&self) -> &PdaDeriver {
        &self.pdas
    }

    pub fn reader(&self) -> &StateReader {
        &self.reader
    }

    fn payer(&self) -> Result<Pubkey> {
        connected_key(self.wallet.as_ref())
    }

    // ================================
    // Gem lifecycle
    // ================================

    /// Mint a gem of `class` into a freshly generated mint
    pub async fn mint(&self, class: Class) -> Result<MintedGem> {
        run("mint gem", async {
            let payer = self.payer()?;
            let mint = Keypair::new();
            let mint_key = mint.pubkey();
            info!("Minting {} gem {}", class, mint_key);

            let request = TransactionRequest::new("mint gem")
                .with_compute_units(MINT_COMPUTE_UNITS)
                .add_instruction(instruction::mint_gem(&self.pdas, &payer, &mint_key, class)?)
                .with_signer(mint);
            let signature = self.submitter.submit(request).await?;

            Ok(MintedGem {
                mint: mint_key,
                signature,
            })
        })
        .await
    }

    /// Seed and reveal a gem's rarity, resuming from whatever phase it is in
    ///
    /// The reveal is never sent before the cooldown after seeding has elapsed.
    pub async fn imprint_rarity(&self, mint: &Pubkey) -> Result<RarityImprint> {
        run("imprint rarity", async {
            let payer = self.payer()?;
            let gem = self.reader.gem(mint).await?;

            let seed_signature = match gem.account.rarity_phase() {
                RarityPhase::Revealed(rarity) => {
                    return Ok(RarityImprint {
                        seed_signature: None,
                        reveal_signature: None,
                        rarity: Some(rarity),
                    });
                }
                RarityPhase::Unseeded => {
                    let request = TransactionRequest::new("seed rarity")
                        .add_instruction(instruction::seed_rarity(&self.pdas, &payer, mint)?);
                    let signature = self.submitter.submit(request).await?;

                    info!(
                        "Rarity seeded for {}, revealing in {:?}",
                        mint, self.config.rarity_reveal_cooldown
                    );
                    tokio::time::sleep(self.config.rarity_reveal_cooldown).await;
                    Some(signature)
                }
                RarityPhase::Seeded { reveal_at } => {
                    let remaining = reveal_at.saturating_sub(unix_timestamp());
                    if remaining > 0 {
                        info!("Rarity for {} can be revealed in {}s", mint, remaining);
                        tokio::time::sleep(Duration::from_secs(u64::from(remaining))).await;
                    }
                    None
                }
            };

            let request = TransactionRequest::new("reveal rarity")
                .add_instruction(instruction::reveal_rarity(&self.pdas, &payer, mint)?);
            let reveal_signature = self.submitter.submit(request).await?;

            let rarity = self.reader.gem(mint).await?.account.rarity;
            Ok(RarityImprint {
                seed_signature,
                reveal_signature: Some(reveal_signature),
                rarity,
            })
        })
        .await
    }

    /// Burn a gem and recover its lamports
    pub async fn redeem(&self, mint: &Pubkey) -> Result<Signature> {
        run("redeem gem", async {
            let payer = self.payer()?;
            let request = TransactionRequest::new("redeem gem")
                .add_instruction(instruction::redeem_gem(&self.pdas, &payer, mint)?);
            self.submitter.submit(request).await
        })
        .await
    }

    pub async fn allocate(&self, mint: &Pubkey) -> Result<Signature> {
        run("allocate gem", async {
            let payer = self.payer()?;
            let request = TransactionRequest::new("allocate gem")
                .add_instruction(instruction::allocate_gem(&self.pdas, &payer, mint)?);
            self.submitter.submit(request).await
        })
        .await
    }

    pub async fn deallocate(&self, mint: &Pubkey) -> Result<Signature> {
        run("deallocate gem", async {
            let payer = self.payer()?;
            let request = TransactionRequest::new("deallocate gem")
                .add_instruction(instruction::deallocate_gem(&self.pdas, &payer, mint)?);
            self.submitter.submit(request).await
        })
        .await
    }

    pub async fn delegate(&self, mint: &Pubkey, vote_account: &Pubkey) -> Result<Signature> {
        run("delegate gem", async {
            let payer = self.payer()?;
            let request = TransactionRequest::new("delegate gem").add_instruction(
                instruction::delegate_gem(&self.pdas, &payer, mint, vote_account)?,
            );
            self.submitter.submit(request).await
        })
        .await
    }

    /// Undelegate a gem from the vote account it is currently delegated to
    pub async fn undelegate(&self, mint: &Pubkey) -> Result<Signature> {
        run("undelegate gem", async {
            let payer = self.payer()?;
            let gem = self.reader.gem(mint).await?;
            let vote_account = gem
                .account
                .delegated_vote_account()
                .ok_or_else(|| InglError::invalid_state("gem is not delegated"))?;

            let request = TransactionRequest::new("undelegate gem").add_instruction(
                instruction::undelegate_gem(&self.pdas, &payer, mint, &vote_account)?,
            );
            self.submitter.submit(request).await
        })
        .await
    }

    // ================================
    // Rewards
    // ================================

    /// Claim rewards for `mints` in one transaction, one instruction per vote account
    pub async fn claim_rewards(&self, mints: &[Pubkey]) -> Result<Signature> {
        run("claim rewards", async {
            let payer = self.payer()?;
            if mints.is_empty() {
                return Err(InglError::invalid_state("no gems selected"));
            }

            let gems = try_join_all(mints.iter().map(|mint| self.reader.gem(mint))).await?;
            let mut pairs = Vec::with_capacity(gems.len());
            for gem in &gems {
                let vote_account = gem.account.delegated_vote_account().ok_or_else(|| {
                    InglError::invalid_state(format!("gem {} is not delegated", gem.mint))
                })?;
                pairs.push((gem.mint, vote_account));
            }

            let grouped = instruction::group_claims(&pairs);
            let vote_data = try_join_all(
                grouped
                    .iter()
                    .map(|(vote_account, _)| self.reader.vote_data(vote_account)),
            )
            .await?;

            let mut request =
                TransactionRequest::new("claim rewards").with_compute_units(CLAIM_COMPUTE_UNITS);
            for ((vote_account, mints), data) in grouped.into_iter().zip(vote_data) {
                let group = ClaimGroup {
                    vote_account,
                    validator_id: data.validator_id,
                    mints,
                };
                let claim = instruction::claim_rewards(&self.pdas, &payer, &group)?;
                request = request.add_instruction(claim);
            }
            self.submitter.submit(request).await
        })
        .await
    }

    // ================================
    // Governance
    // ================================

    /// Vote for candidate `validator_index` of the open proposal with every gem in `mints`
    pub async fn cast_vote(&self, mints: &[Pubkey], validator_index: u32) -> Result<Signature> {
        run("cast vote", async {
            let payer = self.payer()?;
            if mints.is_empty() {
                return Err(InglError::invalid_state("no gems selected"));
            }

            let (index, proposal) = self.latest_proposal().await?;
            if !proposal.is_open() {
                return Err(InglError::invalid_state(format!(
                    "proposal {index} is already finalized"
                )));
            }
            if validator_index as usize >= proposal.validator_ids.len() {
                return Err(InglError::invalid_state(format!(
                    "proposal {index} has no candidate {validator_index}"
                )));
            }

            let address = self.pdas.proposal(index)?;
            let request = TransactionRequest::new("cast vote").add_instruction(
                instruction::cast_vote(&self.pdas, &payer, &address, mints, validator_index)?,
            );
            self.submitter.submit(request).await
        })
        .await
    }

    /// Open the next validator selection proposal
    pub async fn create_proposal(&self) -> Result<Signature> {
        run("create proposal", async {
            let payer = self.payer()?;
            let global = self.reader.global_gems().await?;
            let request = TransactionRequest::new("create proposal").add_instruction(
                instruction::create_proposal(&self.pdas, &payer, global.proposal_numeration)?,
            );
            self.submitter.submit(request).await
        })
        .await
    }

    /// Finalize the most recent proposal
    pub async fn finalize_proposal(&self) -> Result<Signature> {
        run("finalize proposal", async {
            let payer = self.payer()?;
            let (index, _) = self.latest_proposal().await?;
            let request = TransactionRequest::new("finalize proposal")
                .add_instruction(instruction::finalize_proposal(&self.pdas, &payer, index)?);
            self.submitter.submit(request).await
        })
        .await
    }

    async fn latest_proposal(&self) -> Result<(u32, ValidatorProposal)> {
        let global = self.reader.global_gems().await?;
        let index = global
            .proposal_numeration
            .checked_sub(1)
            .ok_or_else(|| InglError::invalid_state("no proposal has been created"))?;
        let proposal = self
            .reader
            .proposal(index)
            .await?
            .ok_or(InglError::AccountNotFound(self.pdas.proposal(index)?))?;
        Ok((index, proposal))
    }

    // ================================
    // Reads
    // ================================

    pub async fn load_global_state(&self) -> Result<GlobalGems> {
        run("load global state", self.reader.global_gems()).await
    }

    pub async fn load_gem(&self, mint: &Pubkey) -> Result<Gem> {
        run("load gem", self.reader.gem(mint)).await
    }

    pub async fn load_gems_for_owner(&self, owner: &Pubkey) -> Result<Vec<Gem>> {
        run("load gems", self.reader.owned_gems(owner)).await
    }

    /// Accrued rewards of every delegated gem held by `owner`
    pub async fn load_rewards(&self, owner: &Pubkey) -> Result<Vec<GemReward>> {
        run("load rewards", async {
            let delegated: Vec<(Gem, Pubkey)> = self
                .reader
                .owned_gems(owner)
                .await?
                .into_iter()
                .filter_map(|gem| {
                    let vote_account = gem.account.delegated_vote_account()?;
                    Some((gem, vote_account))
                })
                .collect();

            let mut vote_accounts: Vec<Pubkey> = delegated.iter().map(|(_, key)| *key).collect();
            vote_accounts.sort();
            vote_accounts.dedup();

            let fetched = join_all(vote_accounts.iter().map(|key| self.reader.try_vote_data(key))).await;
            let mut ledgers: HashMap<Pubkey, VoteAccountData> = HashMap::new();
            for (key, data) in vote_accounts.into_iter().zip(fetched) {
                if let Some(data) = data? {
                    ledgers.insert(key, data);
                }
            }

            Ok(delegated
                .into_iter()
                .filter_map(|(gem, vote_account)| {
                    let ledger = ledgers.get(&vote_account)?;
                    Some(GemReward {
                        mint: gem.mint,
                        vote_account,
                        rewards: rewards_for(&gem.account, ledger, self.config.nfts_share_percent),
                    })
                })
                .collect())
        })
        .await
    }

    pub async fn load_proposals(&self) -> Result<ProposalSet> {
        run("load proposals", async {
            let global = self.reader.global_gems().await?;
            discover_proposals(&self.reader, global.proposal_numeration).await
        })
        .await
    }

    /// Vote accounts created for past proposal winners
    pub async fn load_vote_accounts(&self) -> Result<Vec<VoteAccountEntry>> {
        run("load vote accounts", async {
            let global = self.reader.global_gems().await?;
            discover_vote_accounts(&self.reader, global.proposal_numeration).await
        })
        .await
    }

    /// Enrich validator identities with off-chain metadata
    pub async fn load_validator_details(&self, identities: &[Pubkey]) -> Result<Vec<EnrichedValidator>> {
        run("load validator details", async {
            let feed = ValidatorFeed::new(
                self.config.validator_feed_url.clone(),
                self.config.validator_feed_token.clone(),
            );
            let details = feed.fetch().await?;
            let identities: Vec<String> = identities.iter().map(ToString::to_string).collect();
            Ok(enrich(&identities, &details))
        })
        .await
    }
}
