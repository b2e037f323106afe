//! Instruction builders for the Ingl program
//!
//! The program reads accounts positionally, so every builder emits its account list in the exact
//! order and with the exact signer/writable flags the program expects. Instruction data is the
//! borsh encoding of [`InglInstruction`]: a one-byte opcode followed by the variant payload.

use crate::{
    codec,
    constants::*,
    core::Result,
    pda::{edition_account, metadata_account, token_account, PdaDeriver},
    state::Class,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
    sysvar,
};

/// Opcodes understood by the program, in wire order
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum InglInstruction {
    MintNft(Class),
    MintNewCollection,
    Redeem,
    ImprintRarity,
    AllocateNft,
    DeallocateNft,
    CreateVoteAccount,
    ChangeVoteAccountsValidatorIdentity,
    DelegateNft,
    UndelegateNft,
    InitRarityImprint,
    RegisterValidatorId,
    CreateValidatorSelectionProposal,
    VoteValidatorProposal { num_nfts: u8, validator_index: u32 },
    FinalizeProposal,
    ValidatorWithdraw,
    NftWithdraw { cnt: u32 },
    InitUndelegation,
    ProcessRewards,
}

impl InglInstruction {
    pub fn opcode(&self) -> u8 {
        match self {
            InglInstruction::MintNft(_) => 0,
            InglInstruction::MintNewCollection => 1,
            InglInstruction::Redeem => 2,
            InglInstruction::ImprintRarity => 3,
            InglInstruction::AllocateNft => 4,
            InglInstruction::DeallocateNft => 5,
            InglInstruction::CreateVoteAccount => 6,
            InglInstruction::ChangeVoteAccountsValidatorIdentity => 7,
            InglInstruction::DelegateNft => 8,
            InglInstruction::UndelegateNft => 9,
            InglInstruction::InitRarityImprint => 10,
            InglInstruction::RegisterValidatorId => 11,
            InglInstruction::CreateValidatorSelectionProposal => 12,
            InglInstruction::VoteValidatorProposal { .. } => 13,
            InglInstruction::FinalizeProposal => 14,
            InglInstruction::ValidatorWithdraw => 15,
            InglInstruction::NftWithdraw { .. } => 16,
            InglInstruction::InitUndelegation => 17,
            InglInstruction::ProcessRewards => 18,
        }
    }

    pub fn data(&self) -> Result<Vec<u8>> {
        codec::encode("instruction", self)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        codec::decode_unchecked("instruction", data)
    }
}

/// Gem-related addresses shared by most builders
#[derive(Debug, Clone, Copy)]
struct GemKeys {
    mint: Pubkey,
    gem: Pubkey,
    token_account: Pubkey,
}

impl GemKeys {
    fn new(pdas: &PdaDeriver, owner: &Pubkey, mint: &Pubkey) -> Result<Self> {
        Ok(Self {
            mint: *mint,
            gem: pdas.gem_account(mint)?,
            token_account: token_account(owner, mint),
        })
    }
}

fn build(pdas: &PdaDeriver, instruction: &InglInstruction, accounts: Vec<AccountMeta>) -> Result<Instruction> {
    Ok(Instruction {
        program_id: pdas.program_id(),
        accounts,
        data: instruction.data()?,
    })
}

// ================================
// Gem lifecycle
// ================================

/// Mint a new gem of `class` into a fresh mint account
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[signer, writable]` new mint
/// 2. `[writable]` mint authority PDA
/// 3. `[writable]` payer's associated token account
/// 4. `[]` token program
/// 5. `[]` rent sysvar
/// 6. `[]` system program
/// 7. `[writable]` gem metadata
/// 8. `[writable]` minting pool
/// 9. `[writable]` global gems
/// 10. `[writable]` gem record
/// 11. `[writable]` collection master edition
/// 12. `[writable]` gem master edition
/// 13. `[]` collection mint
/// 14. `[]` collection metadata
/// 15. `[]` system program
/// 16. `[]` token program
/// 17. `[]` associated token program
/// 18. `[]` token metadata program
pub fn mint_gem(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey, class: Class) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;
    let collection_mint = pdas.collection_mint()?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*mint, true),
        AccountMeta::new(pdas.mint_authority()?, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new(metadata_account(mint)?, false),
        AccountMeta::new(pdas.minting_pool()?, false),
        AccountMeta::new(pdas.global_gems()?, false),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new(edition_account(&collection_mint)?, false),
        AccountMeta::new(edition_account(mint)?, false),
        AccountMeta::new_readonly(collection_mint, false),
        AccountMeta::new_readonly(metadata_account(&collection_mint)?, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(METAPLEX_PROGRAM_ID, false),
    ];

    build(pdas, &InglInstruction::MintNft(class), accounts)
}

/// First phase of the rarity handshake: record the seed time
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` gem record
/// 2. `[]` gem mint
/// 3. `[writable]` payer's associated token account
/// 4. `[writable]` mint authority PDA
/// 5. `[]` gem master edition
/// 6. `[]` token program
/// 7. `[]` token metadata program
pub fn seed_rarity(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new_readonly(keys.mint, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.mint_authority()?, false),
        AccountMeta::new_readonly(edition_account(mint)?, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(METAPLEX_PROGRAM_ID, false),
    ];

    build(pdas, &InglInstruction::InitRarityImprint, accounts)
}

/// Second phase of the rarity handshake: compute the rarity from the price feeds
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` gem record
/// 2. `[]` gem mint
/// 3. `[writable]` payer's associated token account
/// 4. `[writable]` mint authority PDA
/// 5. `[writable]` gem metadata
/// 6. `[]` gem master edition
/// 7. `[]` BTC price feed
/// 8. `[]` SOL price feed
/// 9. `[]` ETH price feed
/// 10. `[]` BNB price feed
/// 11. `[]` token program
/// 12. `[]` token metadata program
pub fn reveal_rarity(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new_readonly(keys.mint, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.mint_authority()?, false),
        AccountMeta::new(metadata_account(mint)?, false),
        AccountMeta::new_readonly(edition_account(mint)?, false),
        AccountMeta::new_readonly(BTC_PRICE_FEED, false),
        AccountMeta::new_readonly(SOL_PRICE_FEED, false),
        AccountMeta::new_readonly(ETH_PRICE_FEED, false),
        AccountMeta::new_readonly(BNB_PRICE_FEED, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(METAPLEX_PROGRAM_ID, false),
    ];

    build(pdas, &InglInstruction::ImprintRarity, accounts)
}

/// Burn a gem and return its lamports from the minting pool
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` gem mint
/// 2. `[writable]` minting pool
/// 3. `[writable]` payer's associated token account
/// 4. `[writable]` mint authority PDA
/// 5. `[writable]` gem record
/// 6. `[writable]` gem metadata
/// 7. `[writable]` gem master edition
/// 8. `[writable]` collection metadata
/// 9. `[]` token program
/// 10. `[writable]` treasury
/// 11. `[]` system program
/// 12. `[]` token metadata program
pub fn redeem_gem(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;
    let collection_mint = pdas.collection_mint()?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(keys.mint, false),
        AccountMeta::new(pdas.minting_pool()?, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.mint_authority()?, false),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new(metadata_account(mint)?, false),
        AccountMeta::new(edition_account(mint)?, false),
        AccountMeta::new(metadata_account(&collection_mint)?, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(pdas.treasury()?, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(METAPLEX_PROGRAM_ID, false),
    ];

    build(pdas, &InglInstruction::Redeem, accounts)
}

/// Accounts shared by allocate and deallocate
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[]` gem mint
/// 2. `[writable]` gem record
/// 3. `[writable]` payer's associated token account
/// 4. `[writable]` global gems
/// 5. `[writable]` pending-delegation pool
/// 6. `[writable]` minting pool
/// 7. `[]` system program
fn allocation_accounts(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Vec<AccountMeta>> {
    let keys = GemKeys::new(pdas, payer, mint)?;

    Ok(vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(keys.mint, false),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.global_gems()?, false),
        AccountMeta::new(pdas.pd_pool()?, false),
        AccountMeta::new(pdas.minting_pool()?, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ])
}

/// Move a gem's lamports from the minting pool to the pending-delegation pool
pub fn allocate_gem(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    build(pdas, &InglInstruction::AllocateNft, allocation_accounts(pdas, payer, mint)?)
}

/// Move a gem's lamports back to the minting pool
pub fn deallocate_gem(pdas: &PdaDeriver, payer: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    build(pdas, &InglInstruction::DeallocateNft, allocation_accounts(pdas, payer, mint)?)
}

/// Delegate an allocated gem to a vote account
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[]` vote account
/// 2. `[writable]` vote data
/// 3. `[]` gem mint
/// 4. `[writable]` gem record
/// 5. `[writable]` payer's associated token account
/// 6. `[writable]` global gems
/// 7. `[]` clock sysvar
/// 8. `[]` stake config
/// 9. `[]` system program
/// 10. `[]` stake program
pub fn delegate_gem(
    pdas: &PdaDeriver,
    payer: &Pubkey,
    mint: &Pubkey,
    vote_account: &Pubkey,
) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(*vote_account, false),
        AccountMeta::new(pdas.vote_data(vote_account)?, false),
        AccountMeta::new_readonly(keys.mint, false),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.global_gems()?, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(STAKE_CONFIG_ID, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(STAKE_PROGRAM_ID, false),
    ];

    build(pdas, &InglInstruction::DelegateNft, accounts)
}

/// Return a delegated gem to the pending-delegation pool
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` pending-delegation pool
/// 2. `[]` vote account
/// 3. `[writable]` vote data
/// 4. `[]` gem mint
/// 5. `[writable]` gem record
/// 6. `[writable]` payer's associated token account
/// 7. `[writable]` global gems
pub fn undelegate_gem(
    pdas: &PdaDeriver,
    payer: &Pubkey,
    mint: &Pubkey,
    vote_account: &Pubkey,
) -> Result<Instruction> {
    let keys = GemKeys::new(pdas, payer, mint)?;

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(pdas.pd_pool()?, false),
        AccountMeta::new_readonly(*vote_account, false),
        AccountMeta::new(pdas.vote_data(vote_account)?, false),
        AccountMeta::new_readonly(keys.mint, false),
        AccountMeta::new(keys.gem, false),
        AccountMeta::new(keys.token_account, false),
        AccountMeta::new(pdas.global_gems()?, false),
    ];

    build(pdas, &InglInstruction::UndelegateNft, accounts)
}

// ================================
// Rewards
// ================================

/// Gems delegated to one vote account, claimed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimGroup {
    pub vote_account: Pubkey,
    pub validator_id: Pubkey,
    pub mints: Vec<Pubkey>,
}

/// Group `(mint, vote_account)` pairs by vote account, keeping first-seen order
pub fn group_claims(gems: &[(Pubkey, Pubkey)]) -> Vec<(Pubkey, Vec<Pubkey>)> {
    let mut groups: Vec<(Pubkey, Vec<Pubkey>)> = Vec::new();
    for (mint, vote_account) in gems {
        match groups.iter_mut().find(|(key, _)| key == vote_account) {
            Some((_, mints)) => mints.push(*mint),
            None => groups.push((*vote_account, vec![*mint])),
        }
    }
    groups
}

/// Withdraw accrued rewards for every gem in `group`
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[]` vote account
/// 2. `[]` validator identity
/// 3. `[]` vote data
/// 4. `[writable]` authorized withdrawer PDA
/// 5.. per gem: `[writable]` associated token account, `[]` mint, `[writable]` gem record
/// last. `[]` system program
pub fn claim_rewards(pdas: &PdaDeriver, payer: &Pubkey, group: &ClaimGroup) -> Result<Instruction> {
    let mut accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(group.vote_account, false),
        AccountMeta::new_readonly(group.validator_id, false),
        AccountMeta::new_readonly(pdas.vote_data(&group.vote_account)?, false),
        AccountMeta::new(pdas.authorized_withdrawer()?, false),
    ];

    for mint in &group.mints {
        let keys = GemKeys::new(pdas, payer, mint)?;
        accounts.push(AccountMeta::new(keys.token_account, false));
        accounts.push(AccountMeta::new_readonly(keys.mint, false));
        accounts.push(AccountMeta::new(keys.gem, false));
    }
    accounts.push(AccountMeta::new_readonly(system_program::id(), false));

    let instruction = InglInstruction::NftWithdraw {
        cnt: group.mints.len() as u32,
    };
    build(pdas, &instruction, accounts)
}

// ================================
// Governance
// ================================

/// Vote for candidate `validator_index` on `proposal` with every gem in `mints`
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` proposal
/// 2.. per gem: `[]` mint, `[]` associated token account, `[writable]` gem record
pub fn cast_vote(
    pdas: &PdaDeriver,
    payer: &Pubkey,
    proposal: &Pubkey,
    mints: &[Pubkey],
    validator_index: u32,
) -> Result<Instruction> {
    let num_nfts = u8::try_from(mints.len()).map_err(|_| {
        crate::core::InglError::invalid_state(format!(
            "cannot vote with {} gems in one instruction",
            mints.len()
        ))
    })?;

    let mut accounts = vec![AccountMeta::new(*payer, true), AccountMeta::new(*proposal, false)];
    for mint in mints {
        let keys = GemKeys::new(pdas, payer, mint)?;
        accounts.push(AccountMeta::new_readonly(keys.mint, false));
        accounts.push(AccountMeta::new_readonly(keys.token_account, false));
        accounts.push(AccountMeta::new(keys.gem, false));
    }

    let instruction = InglInstruction::VoteValidatorProposal {
        num_nfts,
        validator_index,
    };
    build(pdas, &instruction, accounts)
}

/// Open proposal number `index`
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` global gems
/// 2. `[writable]` new proposal
/// 3. `[]` system program
pub fn create_proposal(pdas: &PdaDeriver, payer: &Pubkey, index: u32) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(pdas.global_gems()?, false),
        AccountMeta::new(pdas.proposal(index)?, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    build(pdas, &InglInstruction::CreateValidatorSelectionProposal, accounts)
}

/// Close proposal number `index` and record its winner
///
/// # Accounts expected
/// 0. `[signer, writable]` payer
/// 1. `[writable]` proposal
/// 2. `[writable]` global gems
pub fn finalize_proposal(pdas: &PdaDeriver, payer: &Pubkey, index: u32) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(pdas.proposal(index)?, false),
        AccountMeta::new(pdas.global_gems()?, false),
    ];

    build(pdas, &InglInstruction::FinalizeProposal, accounts)
}
