//! Core client types: configuration and error handling

use crate::constants::{INGL_PROGRAM_ID, NFTS_SHARE, RARITY_REVEAL_COOLDOWN_SECS};
use solana_client::client_error::ClientError;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::TransactionError,
};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

// ================================
// Configuration Types
// ================================

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Commitment level for reads and confirmation
    pub commitment: CommitmentConfig,

    /// Deployed Ingl program
    pub program_id: Pubkey,

    /// Percentage of epoch rewards paid out to gem holders
    pub nfts_share_percent: u64,

    /// Delay between seeding and revealing rarity
    pub rarity_reveal_cooldown: Duration,

    /// Interval between signature status polls
    pub confirm_poll_interval: Duration,

    /// Off-chain validator metadata feed
    pub validator_feed_url: String,

    pub validator_feed_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
            program_id: INGL_PROGRAM_ID,
            nfts_share_percent: NFTS_SHARE,
            rarity_reveal_cooldown: Duration::from_secs(RARITY_REVEAL_COOLDOWN_SECS),
            confirm_poll_interval: Duration::from_millis(500),
            validator_feed_url: "https://www.validators.app/api/v1/validators/testnet.json"
                .to_string(),
            validator_feed_token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `INGL_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let rpc_url = std::env::var("INGL_RPC_URL").unwrap_or(defaults.rpc_url);

        let commitment = match std::env::var("INGL_COMMITMENT") {
            Ok(value) => CommitmentConfig::from_str(&value).map_err(|_| {
                InglError::Configuration(format!("unknown commitment level: {value}"))
            })?,
            Err(_) => defaults.commitment,
        };

        let program_id = match std::env::var("INGL_PROGRAM_ID") {
            Ok(value) => Pubkey::from_str(&value)
                .map_err(|e| InglError::Configuration(format!("INGL_PROGRAM_ID: {e}")))?,
            Err(_) => defaults.program_id,
        };

        let nfts_share_percent = parse_env("INGL_NFTS_SHARE", defaults.nfts_share_percent)?;
        if nfts_share_percent > 100 {
            return Err(InglError::Configuration(format!(
                "INGL_NFTS_SHARE must be a percentage, got {nfts_share_percent}"
            )));
        }

        let rarity_reveal_cooldown = Duration::from_secs(parse_env(
            "INGL_RARITY_COOLDOWN_SECS",
            defaults.rarity_reveal_cooldown.as_secs(),
        )?);

        let confirm_poll_interval = Duration::from_millis(parse_env(
            "INGL_CONFIRM_POLL_MS",
            defaults.confirm_poll_interval.as_millis() as u64,
        )?);

        let validator_feed_url =
            std::env::var("INGL_VALIDATOR_FEED_URL").unwrap_or(defaults.validator_feed_url);
        let validator_feed_token = std::env::var("INGL_VALIDATOR_FEED_TOKEN").ok();

        Ok(Self {
            rpc_url,
            commitment,
            program_id,
            nfts_share_percent,
            rarity_reveal_cooldown,
            confirm_poll_interval,
            validator_feed_url,
            validator_feed_token,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| InglError::Configuration(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

// ================================
// Error Types
// ================================

/// Broad failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wallet not connected; raised before any network access
    Precondition,
    /// Bytes did not match the record layout
    Decode,
    /// No valid program address for the seeds
    Derivation,
    /// Fetch, submit or confirm failed, including blockhash expiry
    Network,
    /// The program refused the transaction
    Rejection,
    SigningRefused,
    /// Client-side eligibility check failed
    InvalidState,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Precondition => "precondition",
            ErrorKind::Decode => "decode",
            ErrorKind::Derivation => "derivation",
            ErrorKind::Network => "network",
            ErrorKind::Rejection => "rejection",
            ErrorKind::SigningRefused => "signing refused",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Configuration => "configuration",
        };
        write!(f, "{name}")
    }
}

/// Custom error codes returned by the Ingl program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramErrorCode {
    KeyPairMismatch,
    InvalidStructType,
    InvalidFundsLocation,
    TooEarly,
    TooLate,
    AlreadyVoted,
}

impl ProgramErrorCode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::KeyPairMismatch),
            1 => Some(Self::InvalidStructType),
            2 => Some(Self::InvalidFundsLocation),
            3 => Some(Self::TooEarly),
            4 => Some(Self::TooLate),
            5 => Some(Self::AlreadyVoted),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Error)]
pub enum InglError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("failed to decode {record}: {reason}")]
    Decode { record: &'static str, reason: String },

    #[error("unknown {record} version tag {tag}")]
    UnknownVersion { record: &'static str, tag: u8 },

    #[error("invalid validation phrase for {record}: expected {expected}, found {found}")]
    InvalidValidationPhrase {
        record: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("failed to encode {record}: {reason}")]
    Encode { record: &'static str, reason: String },

    #[error("no valid program address for seeds {seeds} under program {program_id}")]
    Derivation { seeds: String, program_id: Pubkey },

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("RPC error: {0}")]
    Rpc(Box<ClientError>),

    #[error("validator feed error: {0}")]
    Feed(String),

    #[error("blockhash expired before transaction {signature} was confirmed")]
    BlockhashExpired { signature: Signature },

    #[error("transaction rejected: {0}")]
    Rejected(TransactionError),

    #[error("wallet refused to sign: {0}")]
    SigningRefused(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to {operation} with error: {source}")]
    Operation {
        operation: &'static str,
        source: Box<InglError>,
    },
}

impl InglError {
    /// Classify the error, looking through operation wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            InglError::WalletNotConnected => ErrorKind::Precondition,
            InglError::Decode { .. }
            | InglError::UnknownVersion { .. }
            | InglError::InvalidValidationPhrase { .. }
            | InglError::Encode { .. } => ErrorKind::Decode,
            InglError::Derivation { .. } => ErrorKind::Derivation,
            InglError::AccountNotFound(_)
            | InglError::Rpc(_)
            | InglError::Feed(_)
            | InglError::BlockhashExpired { .. } => ErrorKind::Network,
            InglError::Rejected(_) => ErrorKind::Rejection,
            InglError::SigningRefused(_) => ErrorKind::SigningRefused,
            InglError::InvalidState(_) => ErrorKind::InvalidState,
            InglError::Configuration(_) => ErrorKind::Configuration,
            InglError::Operation { source, .. } => source.kind(),
        }
    }

    /// Stable numeric code for the variant
    pub fn code(&self) -> u32 {
        match self {
            InglError::WalletNotConnected => 1000,
            InglError::Decode { .. } => 2000,
            InglError::UnknownVersion { .. } => 2001,
            InglError::InvalidValidationPhrase { .. } => 2002,
            InglError::Encode { .. } => 2003,
            InglError::Derivation { .. } => 3000,
            InglError::AccountNotFound(_) => 4000,
            InglError::Rpc(_) => 4001,
            InglError::Feed(_) => 4002,
            InglError::BlockhashExpired { .. } => 4003,
            InglError::Rejected(_) => 5000,
            InglError::SigningRefused(_) => 6000,
            InglError::InvalidState(_) => 7000,
            InglError::Configuration(_) => 8000,
            InglError::Operation { source, .. } => source.code(),
        }
    }

    /// The innermost cause, without operation wrappers
    pub fn root(&self) -> &InglError {
        match self {
            InglError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Program-specific error carried by a rejection, if any
    pub fn program_error(&self) -> Option<ProgramErrorCode> {
        match self.root() {
            InglError::Rejected(TransactionError::InstructionError(
                _,
                InstructionError::Custom(code),
            )) => ProgramErrorCode::from_code(*code),
            _ => None,
        }
    }

    /// Wrap this error with the name of the operation that failed
    pub fn during(self, operation: &'static str) -> Self {
        InglError::Operation {
            operation,
            source: Box::new(self),
        }
    }

    pub fn decode(record: &'static str, reason: impl fmt::Display) -> Self {
        InglError::Decode {
            record,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        InglError::InvalidState(msg.into())
    }
}

impl From<ClientError> for InglError {
    fn from(err: ClientError) -> Self {
        match err.get_transaction_error() {
            Some(tx_err) => Self::Rejected(tx_err),
            None => Self::Rpc(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for InglError {
    fn from(err: reqwest::Error) -> Self {
        Self::Feed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InglError>;

/// Attach an operation name to the error side of a result
pub trait OperationContext<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|e| e.during(operation))
    }
}
