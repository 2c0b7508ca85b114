//! Error types for the client

use crate::types::{Pubkey, Signature};
use std::fmt;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input violates a bound; detected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No bump value produced an off-curve address
    #[error("Address space exhausted: no valid bump for seeds")]
    AddressSpaceExhausted,

    /// Leading discriminator does not match the schema
    #[error("Schema mismatch: expected {expected}, found {found:02x?}")]
    SchemaMismatch {
        /// Schema that was expected
        expected: &'static str,
        /// Discriminator bytes actually present
        found: Vec<u8>,
    },

    /// Buffer shorter than the schema requires
    #[error("Truncated record: need {needed} bytes, have {len}")]
    TruncatedRecord {
        /// Minimum bytes required
        needed: usize,
        /// Bytes available
        len: usize,
    },

    /// Account exists but cannot be decoded as the requested record
    #[error("Corrupt account {address}: {reason}")]
    CorruptAccount {
        /// Account address
        address: Pubkey,
        /// Decode failure
        reason: String,
    },

    /// No account at the address
    #[error("Account not found at address: {0}")]
    NotFound(Pubkey),

    /// A required signer did not sign
    #[error("Missing signature for required signer {0}")]
    MissingSignature(Pubkey),

    /// Transaction with no instructions
    #[error("Transaction has no instructions")]
    EmptyTransaction,

    /// Serialized transaction exceeds the transport limit
    #[error("Transaction too large: {size} bytes (max {max})")]
    TransactionTooLarge {
        /// Serialized size
        size: usize,
        /// Transport limit
        max: usize,
    },

    /// Freshness token absent or past its validity window
    #[error("Stale freshness token")]
    StaleFreshnessToken,

    /// Transport retries exhausted. The ledger may still have ingested the
    /// transaction; the outcome is unknown.
    #[error("Submission failed after {attempts} attempts (outcome unknown): {reason}")]
    SubmissionFailed {
        /// Attempts made
        attempts: u32,
        /// Last transport failure
        reason: String,
    },

    /// Ledger-confirmed logical rejection
    #[error("Program rejected transaction: {0}")]
    ProgramRejected(RejectionCode),

    /// Freshness window elapsed with no confirmation observed
    #[error("Transaction {signature} expired; rebuild with a fresh blockhash")]
    Expired {
        /// Transaction identity
        signature: Signature,
    },

    /// A repeated operation signed to the bytes of one the ledger already
    /// executed, and no newer blockhash appeared to tell them apart
    #[error("Transaction {signature} was already executed; retry once the blockhash advances")]
    DuplicateTransaction {
        /// Identity shared with the earlier transaction
        signature: Signature,
    },

    /// Caller-configured confirmation wait elapsed; outcome unknown
    #[error("Timed out waiting for confirmation of {signature} (outcome unknown)")]
    ConfirmationTimeout {
        /// Transaction identity
        signature: Signature,
    },

    /// Transport failure before a response (timeout, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The RPC endpoint answered with an error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only transport failures before ledger ingestion are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Numeric rejection code reported by the ledger, decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    /// Target address already holds an account
    AccountAlreadyInUse,
    /// Account address does not match its seeds (wrong owner / signer)
    ConstraintSeeds,
    /// A required signer relationship does not hold
    ConstraintSigner,
    /// Account has not been created
    AccountNotInitialized,
    /// Account is owned by a different program
    AccountOwnedByWrongProgram,
    /// Instruction payload could not be decoded
    InstructionDidNotDeserialize,
    /// Poll start is not before poll end
    InvalidPollWindow,
    /// Vote outside the poll window
    VotingNotOpen,
    /// Counter or vote tally would exceed its maximum
    CounterOverflow,
    /// Counter would go below zero
    CounterUnderflow,
    /// String argument exceeds its bound
    StringTooLong,
    /// Unrecognized code
    Other(u32),
}

impl RejectionCode {
    /// Decode from the ledger's numeric code
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => RejectionCode::AccountAlreadyInUse,
            102 => RejectionCode::InstructionDidNotDeserialize,
            2002 => RejectionCode::ConstraintSigner,
            2006 => RejectionCode::ConstraintSeeds,
            3007 => RejectionCode::AccountOwnedByWrongProgram,
            3012 => RejectionCode::AccountNotInitialized,
            6000 => RejectionCode::InvalidPollWindow,
            6001 => RejectionCode::VotingNotOpen,
            6002 => RejectionCode::CounterOverflow,
            6003 => RejectionCode::CounterUnderflow,
            6004 => RejectionCode::StringTooLong,
            other => RejectionCode::Other(other),
        }
    }

    /// Numeric code
    pub fn code(&self) -> u32 {
        match self {
            RejectionCode::AccountAlreadyInUse => 0,
            RejectionCode::InstructionDidNotDeserialize => 102,
            RejectionCode::ConstraintSigner => 2002,
            RejectionCode::ConstraintSeeds => 2006,
            RejectionCode::AccountOwnedByWrongProgram => 3007,
            RejectionCode::AccountNotInitialized => 3012,
            RejectionCode::InvalidPollWindow => 6000,
            RejectionCode::VotingNotOpen => 6001,
            RejectionCode::CounterOverflow => 6002,
            RejectionCode::CounterUnderflow => 6003,
            RejectionCode::StringTooLong => 6004,
            RejectionCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionCode::AccountAlreadyInUse => "account already exists",
            RejectionCode::ConstraintSeeds => "permission denied: seeds constraint violated",
            RejectionCode::ConstraintSigner => "permission denied: signer constraint violated",
            RejectionCode::AccountNotInitialized => "account not initialized",
            RejectionCode::AccountOwnedByWrongProgram => "account owned by wrong program",
            RejectionCode::InstructionDidNotDeserialize => "instruction did not deserialize",
            RejectionCode::InvalidPollWindow => "poll start must precede poll end",
            RejectionCode::VotingNotOpen => "poll is not open for voting",
            RejectionCode::CounterOverflow => "counter overflow",
            RejectionCode::CounterUnderflow => "counter underflow",
            RejectionCode::StringTooLong => "string exceeds its bound",
            RejectionCode::Other(code) => return write!(f, "program error {}", code),
        };
        write!(f, "{} (code {})", text, self.code())
    }
}
