//! Borsh transcoding for program records
//!
//! Decoding tolerates trailing bytes, since the program allocates accounts larger than the
//! current layout, but a buffer shorter than the layout requires is always an error. Each record
//! also carries a validation phrase that is checked after decoding.

use crate::{
    constants::validation_phrase,
    core::{InglError, Result},
    state::{
        GemAccount, GemAccountVersion, GlobalGems, ValidatorProposal, VoteAccountData, VoteInit,
    },
};
use borsh::{BorshDeserialize, BorshSerialize};

/// Decode a borsh value from the front of `data`, ignoring whatever follows it
pub fn decode_unchecked<T: BorshDeserialize>(record: &'static str, data: &[u8]) -> Result<T> {
    let mut cursor = data;
    T::deserialize(&mut cursor).map_err(|e| InglError::decode(record, e))
}

pub fn encode<T: BorshSerialize>(record: &'static str, value: &T) -> Result<Vec<u8>> {
    borsh::to_vec(value).map_err(|e| InglError::Encode {
        record,
        reason: e.to_string(),
    })
}

/// A record stored in a program-owned account
pub trait AccountRecord: BorshSerialize + BorshDeserialize + Sized {
    const NAME: &'static str;
    const VALIDATION_PHRASE: u32;

    fn validation_phrase(&self) -> u32;

    fn validate(&self) -> Result<()> {
        check_phrase(Self::NAME, Self::VALIDATION_PHRASE, self.validation_phrase())
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let record: Self = decode_unchecked(Self::NAME, data)?;
        record.validate()?;
        Ok(record)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        encode(Self::NAME, self)
    }
}

fn check_phrase(record: &'static str, expected: u32, found: u32) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(InglError::InvalidValidationPhrase {
            record,
            expected,
            found,
        })
    }
}

impl AccountRecord for GlobalGems {
    const NAME: &'static str = "global gems";
    const VALIDATION_PHRASE: u32 = validation_phrase::GLOBAL_GEMS;

    fn validation_phrase(&self) -> u32 {
        self.validation_phrase
    }
}

impl AccountRecord for ValidatorProposal {
    const NAME: &'static str = "validator proposal";
    const VALIDATION_PHRASE: u32 = validation_phrase::VALIDATOR_PROPOSAL;

    fn validation_phrase(&self) -> u32 {
        self.validation_phrase
    }
}

impl AccountRecord for VoteAccountData {
    const NAME: &'static str = "vote account data";
    const VALIDATION_PHRASE: u32 = validation_phrase::VOTE_ACCOUNT_DATA;

    fn validation_phrase(&self) -> u32 {
        self.validation_phrase
    }

    fn validate(&self) -> Result<()> {
        check_phrase(Self::NAME, Self::VALIDATION_PHRASE, self.validation_phrase)?;
        for entry in &self.vote_rewards {
            check_phrase(
                "vote rewards",
                validation_phrase::VOTE_REWARDS,
                entry.validation_phrase,
            )?;
        }
        Ok(())
    }
}

impl AccountRecord for GemAccount {
    const NAME: &'static str = "gem account";
    const VALIDATION_PHRASE: u32 = validation_phrase::GEM_ACCOUNT;

    fn validation_phrase(&self) -> u32 {
        self.validation_phrase
    }

    fn validate(&self) -> Result<()> {
        check_phrase(Self::NAME, Self::VALIDATION_PHRASE, self.validation_phrase)?;
        for vote in &self.all_votes {
            check_phrase(
                "validator vote",
                validation_phrase::VALIDATOR_VOTE,
                vote.validation_phrase,
            )?;
        }
        Ok(())
    }

    /// The leading byte selects the layout; only 0.0.1 has one
    fn decode(data: &[u8]) -> Result<Self> {
        let tag = *data
            .first()
            .ok_or_else(|| InglError::decode(Self::NAME, "empty account data"))?;

        if tag != GemAccountVersion::V0_0_1.tag() {
            return Err(InglError::UnknownVersion {
                record: Self::NAME,
                tag,
            });
        }

        let record: Self = decode_unchecked(Self::NAME, data)?;
        record.validate()?;
        Ok(record)
    }
}

impl VoteInit {
    pub fn decode(data: &[u8]) -> Result<Self> {
        decode_unchecked("vote init", data)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode("vote init", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::ErrorKind,
        state::{tests::sample_gem, Class, FundsLocation, Rarity, ValidatorVote, VoteRewards},
    };
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_gem_layout_prefix() {
        let gem = sample_gem(Class::Sapphire);
        let bytes = gem.encode().unwrap();

        assert_eq!(bytes[0], 0, "version tag");
        assert_eq!(&bytes[1..5], &validation_phrase::GEM_ACCOUNT.to_le_bytes());
        assert_eq!(&bytes[5..9], &gem.date_created.to_le_bytes());
        assert_eq!(bytes[9], 2, "Sapphire is the third class");
    }

    #[test]
    fn test_funds_location_tagging() {
        let vote_account = Pubkey::new_unique();
        let bytes = encode(
            "funds location",
            &FundsLocation::VoteAccount {
                vote_account_id: vote_account,
            },
        )
        .unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..], vote_account.as_ref());

        let decoded: FundsLocation = decode_unchecked("funds location", &[1]).unwrap();
        assert_eq!(decoded, FundsLocation::PdPool);

        let err = decode_unchecked::<FundsLocation>("funds location", &[3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut gem = sample_gem(Class::Ruby);
        gem.rarity_seed_time = Some(42);
        gem.rarity = Some(Rarity::Exalted);

        let mut bytes = gem.encode().unwrap();
        bytes.extend_from_slice(&[0u8; 128]);
        assert_eq!(GemAccount::decode(&bytes).unwrap(), gem);
    }

    #[test]
    fn test_short_buffer_fails() {
        let gem = sample_gem(Class::Emerald);
        let bytes = gem.encode().unwrap();

        for cut in [1, 9, bytes.len() - 1] {
            let err = GemAccount::decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, InglError::Decode { .. }), "cut at {cut}: {err}");
        }

        let err = GemAccount::decode(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_unknown_gem_version_is_rejected() {
        let mut bytes = sample_gem(Class::Ruby).encode().unwrap();
        bytes[0] = 1;
        assert!(matches!(
            GemAccount::decode(&bytes),
            Err(InglError::UnknownVersion { tag: 1, .. })
        ));

        bytes[0] = 0xff;
        assert!(matches!(
            GemAccount::decode(&bytes),
            Err(InglError::UnknownVersion { tag: 0xff, .. })
        ));
    }

    #[test]
    fn test_validation_phrase_is_checked() {
        let global = GlobalGems {
            validation_phrase: 1,
            counter: 0,
            total_raised: 0,
            pd_pool_total: 0,
            delegated_total: 0,
            dealloced_total: 0,
            is_proposal_ongoing: false,
            proposal_numeration: 0,
            pending_delegation_total: 0,
            validator_list: vec![],
        };
        let bytes = global.encode().unwrap();
        assert!(matches!(
            GlobalGems::decode(&bytes),
            Err(InglError::InvalidValidationPhrase { found: 1, .. })
        ));
    }

    #[test]
    fn test_nested_phrases_are_checked() {
        let mut gem = sample_gem(Class::Diamond);
        gem.all_votes.push(ValidatorVote {
            validation_phrase: 0,
            proposal_id: Pubkey::new_unique(),
            validator_index: 0,
        });
        let bytes = gem.encode().unwrap();
        assert!(GemAccount::decode(&bytes).is_err());

        let data = VoteAccountData {
            validation_phrase: validation_phrase::VOTE_ACCOUNT_DATA,
            total_delegated: 0,
            last_withdraw_epoch: 0,
            dealloced: 0,
            pending_validator_rewards: None,
            validator_id: Pubkey::new_unique(),
            pending_delegation_total: 0,
            vote_rewards: vec![VoteRewards {
                validation_phrase: 3,
                epoch_number: 1,
                total_reward: 1,
                total_stake: 1,
            }],
        };
        let bytes = data.encode().unwrap();
        assert!(VoteAccountData::decode(&bytes).is_err());
    }

    #[test]
    fn test_vote_init_layout() {
        let init = VoteInit {
            node_pubkey: Pubkey::new_unique(),
            authorized_voter: Pubkey::new_unique(),
            authorized_withdrawer: Pubkey::new_unique(),
            commission: 10,
        };
        let bytes = init.encode().unwrap();
        assert_eq!(bytes.len(), 97);
        assert_eq!(VoteInit::decode(&bytes).unwrap(), init);
    }
}
