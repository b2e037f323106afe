/// Ingl CLI Tool
///
/// A command-line interface for minting, delegating and governing Ingl gems
/// using the Ingl Rust SDK.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ingl_sdk::{
    client::unix_timestamp, state::FundsState, validators::EnrichedValidator, Class, ClientConfig,
    Gem, GemReward, GlobalGems, InglClient, KeypairWallet, ProposalSet, ProposalStatus,
    VoteAccountEntry,
};
use serde_json::{json, Value};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Signature},
    signer::Signer,
};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ingl-cli")]
#[command(about = "A command-line interface for the Ingl protocol")]
#[command(version)]
struct Cli {
    /// RPC endpoint URL
    #[arg(long, env = "INGL_RPC_URL")]
    rpc_url: Option<String>,

    /// Ingl program id
    #[arg(long, env = "INGL_PROGRAM_ID")]
    program_id: Option<Pubkey>,

    /// Path to keypair file
    #[arg(long, env = "INGL_KEYPAIR", default_value = "~/.config/solana/id.json")]
    keypair: String,

    /// Commitment level (processed, confirmed, finalized)
    #[arg(long)]
    commitment: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a new gem
    Mint {
        /// Gem class (ruby, diamond, sapphire, emerald, serendibite, benitoite)
        #[arg(long)]
        class: Class,
    },
    /// Seed and reveal the rarity of a gem
    ImprintRarity { mint: Pubkey },
    /// Burn a gem and recover its funds
    Redeem { mint: Pubkey },
    /// Move a gem's funds into the pending delegation pool
    Allocate { mint: Pubkey },
    /// Return a gem's funds from the pending delegation pool
    Deallocate { mint: Pubkey },
    /// Delegate a gem to a vote account
    Delegate {
        mint: Pubkey,
        #[arg(long)]
        vote_account: Pubkey,
    },
    /// Undelegate a gem from its vote account
    Undelegate { mint: Pubkey },
    /// Claim rewards for delegated gems
    Claim {
        #[arg(required = true)]
        mints: Vec<Pubkey>,
    },
    /// Vote on the open proposal
    Vote {
        /// Index of the candidate validator
        #[arg(long)]
        validator_index: u32,
        #[arg(required = true)]
        mints: Vec<Pubkey>,
    },
    /// Open the next validator selection proposal
    CreateProposal,
    /// Finalize the latest proposal
    FinalizeProposal,
    /// List gems held by an owner
    Gems {
        /// Defaults to the keypair's public key
        #[arg(long)]
        owner: Option<Pubkey>,
    },
    /// Show one gem
    Gem { mint: Pubkey },
    /// Show accrued rewards of an owner's delegated gems
    Rewards {
        #[arg(long)]
        owner: Option<Pubkey>,
    },
    /// List validator selection proposals
    Proposals,
    /// Show global counters
    Global,
    /// List program vote accounts
    VoteAccounts,
    /// Show off-chain details of validator identities
    Validators {
        #[arg(required = true)]
        identities: Vec<Pubkey>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ClientConfig::from_env()?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(program_id) = cli.program_id {
        config.program_id = program_id;
    }
    if let Some(commitment) = cli.commitment {
        config.commitment = CommitmentConfig::from_str(&commitment)
            .map_err(|_| anyhow!("unknown commitment level: {commitment}"))?;
    }

    let keypair_path = shellexpand::tilde(&cli.keypair);
    let keypair = read_keypair_file(keypair_path.as_ref())
        .map_err(|e| anyhow!("failed to read keypair {}: {}", keypair_path, e))?;
    let owner = keypair.pubkey();
    debug!("Using wallet {}", owner);

    let client = InglClient::connect(config, Arc::new(KeypairWallet::new(keypair)));

    match cli.command {
        Commands::Mint { class } => {
            let minted = client.mint(class).await?;
            print_json(&json!({
                "mint": minted.mint.to_string(),
                "signature": minted.signature.to_string(),
            }))?;
        }
        Commands::ImprintRarity { mint } => {
            let imprint = client.imprint_rarity(&mint).await?;
            print_json(&json!({
                "mint": mint.to_string(),
                "seed_signature": imprint.seed_signature.map(|s| s.to_string()),
                "reveal_signature": imprint.reveal_signature.map(|s| s.to_string()),
                "rarity": imprint.rarity.map(|r| r.to_string()),
            }))?;
        }
        Commands::Redeem { mint } => print_signature("redeemed", client.redeem(&mint).await?),
        Commands::Allocate { mint } => print_signature("allocated", client.allocate(&mint).await?),
        Commands::Deallocate { mint } => {
            print_signature("deallocated", client.deallocate(&mint).await?)
        }
        Commands::Delegate { mint, vote_account } => {
            print_signature("delegated", client.delegate(&mint, &vote_account).await?)
        }
        Commands::Undelegate { mint } => {
            print_signature("undelegated", client.undelegate(&mint).await?)
        }
        Commands::Claim { mints } => {
            print_signature("claimed", client.claim_rewards(&mints).await?)
        }
        Commands::Vote {
            validator_index,
            mints,
        } => print_signature("voted", client.cast_vote(&mints, validator_index).await?),
        Commands::CreateProposal => {
            print_signature("proposal created", client.create_proposal().await?)
        }
        Commands::FinalizeProposal => {
            print_signature("proposal finalized", client.finalize_proposal().await?)
        }
        Commands::Gems { owner: target } => {
            let gems = client.load_gems_for_owner(&target.unwrap_or(owner)).await?;
            print_json(&Value::Array(gems.iter().map(gem_json).collect()))?;
        }
        Commands::Gem { mint } => print_json(&gem_json(&client.load_gem(&mint).await?))?,
        Commands::Rewards { owner: target } => {
            let rewards = client.load_rewards(&target.unwrap_or(owner)).await?;
            print_json(&rewards_json(&rewards))?;
        }
        Commands::Proposals => print_json(&proposals_json(&client.load_proposals().await?))?,
        Commands::Global => print_json(&global_json(&client.load_global_state().await?))?,
        Commands::VoteAccounts => {
            print_json(&vote_accounts_json(&client.load_vote_accounts().await?))?
        }
        Commands::Validators { identities } => {
            let enriched: Vec<EnrichedValidator> =
                client.load_validator_details(&identities).await?;
            print_json(&serde_json::to_value(enriched).context("failed to render validators")?)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_signature(action: &str, signature: Signature) {
    info!("Transaction confirmed: {}", action);
    println!("{signature}");
}

fn gem_json(gem: &Gem) -> Value {
    let account = &gem.account;
    let (funds, vote_account) = match account.funds_state() {
        FundsState::Unassigned => ("unassigned", None),
        FundsState::Allocated => ("allocated", None),
        FundsState::Delegated(vote_account) => ("delegated", Some(vote_account.to_string())),
    };

    json!({
        "mint": gem.mint.to_string(),
        "address": gem.address.to_string(),
        "numeration": account.numeration,
        "class": account.class.to_string(),
        "rarity": account.rarity.map(|r| r.to_string()),
        "funds": funds,
        "vote_account": vote_account,
        "date_created": account.date_created,
        "redeemable_date": account.redeemable_date,
        "can_redeem": account.can_redeem(unix_timestamp()),
        "last_voted_proposal": account.last_voted_proposal.map(|p| p.to_string()),
        "votes": account.all_votes.len(),
    })
}

fn rewards_json(rewards: &[GemReward]) -> Value {
    let total: f64 = rewards.iter().map(|reward| reward.rewards).sum();
    json!({
        "total": total,
        "gems": rewards
            .iter()
            .map(|reward| json!({
                "mint": reward.mint.to_string(),
                "vote_account": reward.vote_account.to_string(),
                "rewards": reward.rewards,
            }))
            .collect::<Vec<_>>(),
    })
}

fn proposals_json(set: &ProposalSet) -> Value {
    let entries: Vec<Value> = set
        .entries
        .iter()
        .map(|entry| {
            let (status, winner) = match entry.status() {
                ProposalStatus::Open => ("open", None),
                ProposalStatus::Closed { winner, .. } => ("closed", winner.map(|w| w.to_string())),
            };
            json!({
                "index": entry.index,
                "address": entry.address.to_string(),
                "status": status,
                "date_created": entry.proposal.date_created,
                "date_finalized": entry.proposal.date_finalized,
                "winner": winner,
                "candidates": entry
                    .proposal
                    .validator_ids
                    .iter()
                    .zip(entry.proposal.votes.iter().chain(std::iter::repeat(&0)))
                    .map(|(id, votes)| json!({ "validator": id.to_string(), "votes": votes }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "selected": set.default_selection().map(|entry| entry.index),
        "proposals": entries,
    })
}

fn global_json(global: &GlobalGems) -> Value {
    json!({
        "gems_minted": global.counter,
        "total_raised_sol": global.total_raised_sol(),
        "pd_pool_total_sol": global.pd_pool_total_sol(),
        "delegated_total_sol": global.delegated_total_sol(),
        "is_proposal_ongoing": global.is_proposal_ongoing,
        "proposal_numeration": global.proposal_numeration,
        "validator_list": global
            .validator_list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    })
}

fn vote_accounts_json(entries: &[VoteAccountEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|entry| {
                json!({
                    "vote_account": entry.vote_account.to_string(),
                    "validator_id": entry.validator_id.to_string(),
                })
            })
            .collect(),
    )
}
