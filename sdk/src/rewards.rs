//! Holder reward computation over a vote account's epoch ledger

use crate::state::{GemAccount, VoteAccountData, VoteRewards};
use solana_sdk::pubkey::Pubkey;

/// Rewards accrued by one delegated gem
#[derive(Debug, Clone, PartialEq)]
pub struct GemReward {
    pub mint: Pubkey,
    pub vote_account: Pubkey,
    /// Accrued rewards in SOL
    pub rewards: f64,
}

/// Share of one epoch owed to a gem of `weight` SOL
fn epoch_share(entry: &VoteRewards, nfts_share_percent: u64, weight: u64) -> f64 {
    if entry.total_stake == 0 {
        return 0.0;
    }
    (entry.total_reward as f64 * nfts_share_percent as f64 * weight as f64)
        / (100.0 * entry.total_stake as f64)
}

/// Rewards accrued after the gem's checkpoint epoch
///
/// The checkpoint is the later of the last withdrawal and last delegation epochs. Only ledger
/// entries after the checkpoint entry count, since the checkpoint epoch has already paid out. A
/// gem without a checkpoint, or whose checkpoint is not in the ledger, has accrued nothing.
pub fn rewards_for(gem: &GemAccount, vote_data: &VoteAccountData, nfts_share_percent: u64) -> f64 {
    let Some(checkpoint) = gem.checkpoint_epoch() else {
        return 0.0;
    };

    let Some(position) = vote_data
        .vote_rewards
        .iter()
        .position(|entry| entry.epoch_number == checkpoint)
    else {
        return 0.0;
    };

    let weight = gem.class.weight();
    vote_data.vote_rewards[position + 1..]
        .iter()
        .map(|entry| epoch_share(entry, nfts_share_percent, weight))
        .sum()
}
