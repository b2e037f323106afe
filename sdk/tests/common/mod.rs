//! In-memory ledger that executes Ingl instructions against stored account bytes

#![allow(dead_code)]

use async_trait::async_trait;
use ingl_sdk::{
    codec::AccountRecord,
    constants::{validation_phrase, RARITY_REVEAL_COOLDOWN_SECS},
    core::{InglError, ProgramErrorCode, Result},
    instruction::InglInstruction,
    pda::PdaDeriver,
    rpc::{LedgerRpc, SignatureStatus, TokenHolding},
    state::{
        FundsLocation, GemAccount, GemAccountVersion, GlobalGems, Rarity, ValidatorProposal,
        ValidatorVote, VoteAccountData, VoteRewards,
    },
};
use solana_sdk::{
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

pub const START_TIME: u32 = 1_700_000_000;

/// An executed Ingl instruction and when it reached the ledger
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    pub opcode: u8,
    pub at: tokio::time::Instant,
}

struct LedgerState {
    accounts: HashMap<Pubkey, Vec<u8>>,
    holdings: HashMap<Pubkey, Vec<TokenHolding>>,
    statuses: HashMap<Signature, std::result::Result<(), TransactionError>>,
    submissions: Vec<Submission>,
    epoch: u64,
    block_height: u64,
    now: u32,
}

pub struct FakeLedger {
    pdas: PdaDeriver,
    calls: AtomicUsize,
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    /// Ledger with an initialized global record listing `validators` as candidates
    pub fn new(pdas: PdaDeriver, validators: Vec<Pubkey>) -> Self {
        let global = GlobalGems {
            validation_phrase: validation_phrase::GLOBAL_GEMS,
            counter: 0,
            total_raised: 0,
            pd_pool_total: 0,
            delegated_total: 0,
            dealloced_total: 0,
            is_proposal_ongoing: false,
            proposal_numeration: 0,
            pending_delegation_total: 0,
            validator_list: validators,
        };

        let mut accounts = HashMap::new();
        accounts.insert(pdas.global_gems().unwrap(), global.encode().unwrap());

        Self {
            pdas,
            calls: AtomicUsize::new(0),
            state: Mutex::new(LedgerState {
                accounts,
                holdings: HashMap::new(),
                statuses: HashMap::new(),
                submissions: Vec::new(),
                epoch: 0,
                block_height: 1_000,
                now: START_TIME,
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_epoch(&self, epoch: u64) {
        self.state.lock().unwrap().epoch = epoch;
    }

    pub fn set_now(&self, now: u32) {
        self.state.lock().unwrap().now = now;
    }

    pub fn put<T: AccountRecord>(&self, address: Pubkey, record: &T) {
        let bytes = record.encode().unwrap();
        self.state.lock().unwrap().accounts.insert(address, bytes);
    }

    pub fn get<T: AccountRecord>(&self, address: &Pubkey) -> Option<T> {
        let state = self.state.lock().unwrap();
        state.accounts.get(address).map(|data| T::decode(data).unwrap())
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Vote account data with the given `(epoch, reward, stake)` ledger
    pub fn put_vote_data(&self, vote_account: &Pubkey, validator_id: Pubkey, rows: &[(u64, u64, u64)]) {
        let data = VoteAccountData {
            validation_phrase: validation_phrase::VOTE_ACCOUNT_DATA,
            total_delegated: 0,
            last_withdraw_epoch: 0,
            dealloced: 0,
            pending_validator_rewards: None,
            validator_id,
            pending_delegation_total: 0,
            vote_rewards: rows
                .iter()
                .map(|&(epoch_number, total_reward, total_stake)| VoteRewards {
                    validation_phrase: validation_phrase::VOTE_REWARDS,
                    epoch_number,
                    total_reward,
                    total_stake,
                })
                .collect(),
        };
        self.put(self.pdas.vote_data(vote_account).unwrap(), &data);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn program_error(index: usize, code: ProgramErrorCode) -> TransactionError {
    TransactionError::InstructionError(index as u8, InstructionError::Custom(code.code()))
}

/// Accounts touched by one transaction, committed only if every instruction succeeds
struct Execution<'a> {
    accounts: HashMap<Pubkey, Vec<u8>>,
    holdings: HashMap<Pubkey, Vec<TokenHolding>>,
    state: &'a LedgerState,
    index: usize,
}

impl Execution<'_> {
    fn load<T: AccountRecord>(&self, address: &Pubkey) -> std::result::Result<T, TransactionError> {
        let data = self
            .accounts
            .get(address)
            .ok_or(TransactionError::AccountNotFound)?;
        T::decode(data).map_err(|_| program_error(self.index, ProgramErrorCode::InvalidStructType))
    }

    fn store<T: AccountRecord>(&mut self, address: Pubkey, record: &T) {
        self.accounts.insert(address, record.encode().unwrap());
    }

    fn fail(&self, code: ProgramErrorCode) -> TransactionError {
        program_error(self.index, code)
    }

    fn apply(
        &mut self,
        instruction: InglInstruction,
        keys: &[Pubkey],
    ) -> std::result::Result<(), TransactionError> {
        let now = self.state.now;
        match instruction {
            InglInstruction::MintNft(class) => {
                let (payer, mint, token_account, global_key, gem_key) =
                    (keys[0], keys[1], keys[3], keys[9], keys[10]);
                let mut global: GlobalGems = self.load(&global_key)?;
                let gem = GemAccount {
                    struct_id: GemAccountVersion::V0_0_1,
                    validation_phrase: validation_phrase::GEM_ACCOUNT,
                    date_created: now,
                    class,
                    redeemable_date: now,
                    numeration: global.counter,
                    rarity: None,
                    funds_location: FundsLocation::MintingPool,
                    rarity_seed_time: None,
                    date_allocated: None,
                    last_voted_proposal: None,
                    last_withdrawal_epoch: None,
                    last_delegation_epoch: None,
                    all_withdraws: vec![],
                    all_votes: vec![],
                };
                global.counter += 1;
                global.total_raised += class.lamports();
                self.store(gem_key, &gem);
                self.store(global_key, &global);
                self.holdings.entry(payer).or_default().push(TokenHolding {
                    address: token_account,
                    mint,
                    amount: 1,
                });
            }
            InglInstruction::InitRarityImprint => {
                let mut gem: GemAccount = self.load(&keys[1])?;
                if gem.rarity_seed_time.is_some() {
                    return Err(self.fail(ProgramErrorCode::TooLate));
                }
                gem.rarity_seed_time = Some(now + RARITY_REVEAL_COOLDOWN_SECS as u32);
                self.store(keys[1], &gem);
            }
            InglInstruction::ImprintRarity => {
                let mut gem: GemAccount = self.load(&keys[1])?;
                if gem.rarity_seed_time.is_none() || gem.rarity.is_some() {
                    return Err(self.fail(ProgramErrorCode::TooEarly));
                }
                gem.rarity = Some(Rarity::Rare);
                self.store(keys[1], &gem);
            }
            InglInstruction::AllocateNft => {
                let mut gem: GemAccount = self.load(&keys[2])?;
                if gem.funds_location != FundsLocation::MintingPool {
                    return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                }
                gem.funds_location = FundsLocation::PdPool;
                gem.date_allocated = Some(now);
                self.store(keys[2], &gem);
            }
            InglInstruction::DeallocateNft => {
                let mut gem: GemAccount = self.load(&keys[2])?;
                if gem.funds_location != FundsLocation::PdPool {
                    return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                }
                if now < gem.redeemable_date {
                    return Err(self.fail(ProgramErrorCode::TooEarly));
                }
                gem.funds_location = FundsLocation::MintingPool;
                self.store(keys[2], &gem);
            }
            InglInstruction::Redeem => {
                let gem: GemAccount = self.load(&keys[5])?;
                if !gem.can_redeem(now) {
                    return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                }
                self.accounts.remove(&keys[5]);
                let mint = keys[1];
                if let Some(holdings) = self.holdings.get_mut(&keys[0]) {
                    holdings.retain(|holding| holding.mint != mint);
                }
            }
            InglInstruction::DelegateNft => {
                let mut gem: GemAccount = self.load(&keys[4])?;
                if gem.funds_location != FundsLocation::PdPool {
                    return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                }
                gem.funds_location = FundsLocation::VoteAccount {
                    vote_account_id: keys[1],
                };
                gem.last_delegation_epoch = Some(self.state.epoch);
                self.store(keys[4], &gem);
            }
            InglInstruction::UndelegateNft => {
                let mut gem: GemAccount = self.load(&keys[5])?;
                if gem.delegated_vote_account() != Some(keys[2]) {
                    return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                }
                gem.funds_location = FundsLocation::PdPool;
                self.store(keys[5], &gem);
            }
            InglInstruction::NftWithdraw { cnt } => {
                let epoch = self.state.epoch;
                for i in 0..cnt as usize {
                    let gem_key = keys[5 + 3 * i + 2];
                    let mut gem: GemAccount = self.load(&gem_key)?;
                    if gem.delegated_vote_account() != Some(keys[1]) {
                        return Err(self.fail(ProgramErrorCode::InvalidFundsLocation));
                    }
                    gem.last_withdrawal_epoch = Some(epoch);
                    gem.all_withdraws.push(epoch);
                    self.store(gem_key, &gem);
                }
            }
            InglInstruction::CreateValidatorSelectionProposal => {
                let mut global: GlobalGems = self.load(&keys[1])?;
                if global.is_proposal_ongoing {
                    return Err(self.fail(ProgramErrorCode::TooEarly));
                }
                let proposal = ValidatorProposal {
                    validation_phrase: validation_phrase::VALIDATOR_PROPOSAL,
                    validator_ids: global.validator_list.clone(),
                    date_created: now,
                    date_finalized: None,
                    // one tally per candidate; the program itself starts from [0, len]
                    votes: vec![0; global.validator_list.len()],
                    winner: None,
                };
                global.is_proposal_ongoing = true;
                global.proposal_numeration += 1;
                self.store(keys[2], &proposal);
                self.store(keys[1], &global);
            }
            InglInstruction::VoteValidatorProposal {
                num_nfts,
                validator_index,
            } => {
                let proposal_key = keys[1];
                let mut proposal: ValidatorProposal = self.load(&proposal_key)?;
                if !proposal.is_open() {
                    return Err(self.fail(ProgramErrorCode::TooLate));
                }
                for i in 0..num_nfts as usize {
                    let gem_key = keys[2 + 3 * i + 2];
                    let mut gem: GemAccount = self.load(&gem_key)?;
                    if gem.last_voted_proposal == Some(proposal_key) {
                        return Err(self.fail(ProgramErrorCode::AlreadyVoted));
                    }
                    gem.last_voted_proposal = Some(proposal_key);
                    gem.all_votes.push(ValidatorVote {
                        validation_phrase: validation_phrase::VALIDATOR_VOTE,
                        proposal_id: proposal_key,
                        validator_index,
                    });
                    proposal.votes[validator_index as usize] += gem.class.weight() as u32;
                    self.store(gem_key, &gem);
                }
                self.store(proposal_key, &proposal);
            }
            InglInstruction::FinalizeProposal => {
                let mut proposal: ValidatorProposal = self.load(&keys[1])?;
                let mut global: GlobalGems = self.load(&keys[2])?;
                if !proposal.is_open() {
                    return Err(self.fail(ProgramErrorCode::TooLate));
                }
                let winner = (0..proposal.votes.len()).max_by_key(|&i| proposal.votes[i]);
                proposal.winner = winner.map(|i| proposal.validator_ids[i]);
                proposal.date_finalized = Some(now);
                global.is_proposal_ongoing = false;
                self.store(keys[1], &proposal);
                self.store(keys[2], &global);
            }
            _ => return Err(self.fail(ProgramErrorCode::InvalidStructType)),
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        self.tick();
        Ok(self.state.lock().unwrap().accounts.get(address).cloned())
    }

    async fn get_token_holdings(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        self.tick();
        let state = self.state.lock().unwrap();
        Ok(state.holdings.get(owner).cloned().unwrap_or_default())
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        self.tick();
        let height = self.state.lock().unwrap().block_height;
        Ok((Hash::new_unique(), height + 150))
    }

    async fn get_block_height(&self) -> Result<u64> {
        self.tick();
        Ok(self.state.lock().unwrap().block_height)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        self.tick();
        transaction.verify().map_err(InglError::Rejected)?;
        let signature = transaction.signatures[0];
        let message = &transaction.message;

        let mut state = self.state.lock().unwrap();
        let mut execution = Execution {
            accounts: state.accounts.clone(),
            holdings: state.holdings.clone(),
            state: &*state,
            index: 0,
        };

        let mut executed = Vec::new();
        let mut outcome = Ok(());
        for (index, compiled) in message.instructions.iter().enumerate() {
            let program_id = message.account_keys[compiled.program_id_index as usize];
            if program_id != self.pdas.program_id() {
                continue;
            }
            let keys: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|&i| message.account_keys[i as usize])
                .collect();
            let instruction = InglInstruction::decode(&compiled.data).unwrap();
            executed.push(instruction.opcode());

            execution.index = index;
            if let Err(err) = execution.apply(instruction, &keys) {
                outcome = Err(err);
                break;
            }
        }

        let Execution {
            accounts, holdings, ..
        } = execution;
        let at = tokio::time::Instant::now();
        state
            .submissions
            .extend(executed.into_iter().map(|opcode| Submission { opcode, at }));
        if outcome.is_ok() {
            state.accounts = accounts;
            state.holdings = holdings;
        }
        state.statuses.insert(signature, outcome);
        state.block_height += 1;
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus> {
        self.tick();
        Ok(self.state.lock().unwrap().statuses.get(signature).cloned())
    }
}
