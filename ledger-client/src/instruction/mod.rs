//! Instruction builders
//!
//! One pure function per operation. Each validates its arguments first, then
//! resolves addresses, then emits an [`Instruction`] carrying the target
//! program, the ordered account roles and the
//! `[8-byte discriminator][encoded arguments]` payload. Builders never touch
//! the network.

pub mod counter;
pub mod journal;
pub mod voting;

use crate::crypto::discriminator;
use crate::schema::{codec, DISCRIMINATOR_LEN};
use crate::types::Instruction;
use crate::{Error, Result};
use bincode::Options;
use serde::de::DeserializeOwned;

/// Tag for an instruction name
pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("global", name)
}

/// Decoded instruction payload for every operation the programs accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramInstruction {
    /// Create a poll
    InitializePoll {
        /// Poll identifier
        poll_id: u64,
        /// Question text
        description: String,
        /// Opening time
        poll_start: i64,
        /// Closing time
        poll_end: i64,
    },
    /// Register a candidate under a poll
    InitializeCandidate {
        /// Candidate name
        candidate_name: String,
        /// Poll identifier
        poll_id: u64,
    },
    /// Cast one vote
    Vote {
        /// Candidate name
        candidate_name: String,
        /// Poll identifier
        poll_id: u64,
    },
    /// Create a journal entry
    CreateJournalEntry {
        /// Title
        title: String,
        /// Body
        message: String,
    },
    /// Replace a journal entry's message
    UpdateJournalEntry {
        /// Title
        title: String,
        /// New body
        message: String,
    },
    /// Remove a journal entry
    DeleteJournalEntry {
        /// Title
        title: String,
    },
    /// Create a counter at zero
    Initialize,
    /// Add one
    Increment,
    /// Subtract one
    Decrement,
    /// Overwrite the value
    Set {
        /// New value
        value: u8,
    },
    /// Remove the counter account
    Close,
}

const INSTRUCTION_NAMES: [&str; 11] = [
    "initialize_poll",
    "initialize_candidate",
    "vote",
    "create_journal_entry",
    "update_journal_entry",
    "delete_journal_entry",
    "initialize",
    "increment",
    "decrement",
    "set",
    "close",
];

impl ProgramInstruction {
    /// Operation name, the source of the discriminator
    pub fn name(&self) -> &'static str {
        match self {
            ProgramInstruction::InitializePoll { .. } => "initialize_poll",
            ProgramInstruction::InitializeCandidate { .. } => "initialize_candidate",
            ProgramInstruction::Vote { .. } => "vote",
            ProgramInstruction::CreateJournalEntry { .. } => "create_journal_entry",
            ProgramInstruction::UpdateJournalEntry { .. } => "update_journal_entry",
            ProgramInstruction::DeleteJournalEntry { .. } => "delete_journal_entry",
            ProgramInstruction::Initialize => "initialize",
            ProgramInstruction::Increment => "increment",
            ProgramInstruction::Decrement => "decrement",
            ProgramInstruction::Set { .. } => "set",
            ProgramInstruction::Close => "close",
        }
    }

    /// Encode as `[discriminator][arguments]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut data = instruction_discriminator(self.name()).to_vec();
        let args = match self {
            ProgramInstruction::InitializePoll {
                poll_id,
                description,
                poll_start,
                poll_end,
            } => codec().serialize(&(poll_id, description, poll_start, poll_end))?,
            ProgramInstruction::InitializeCandidate {
                candidate_name,
                poll_id,
            }
            | ProgramInstruction::Vote {
                candidate_name,
                poll_id,
            } => codec().serialize(&(candidate_name, poll_id))?,
            ProgramInstruction::CreateJournalEntry { title, message }
            | ProgramInstruction::UpdateJournalEntry { title, message } => {
                codec().serialize(&(title, message))?
            }
            ProgramInstruction::DeleteJournalEntry { title } => codec().serialize(title)?,
            ProgramInstruction::Set { value } => vec![*value],
            ProgramInstruction::Initialize
            | ProgramInstruction::Increment
            | ProgramInstruction::Decrement
            | ProgramInstruction::Close => Vec::new(),
        };
        data.extend(args);
        Ok(data)
    }

    /// Decode a payload produced by [`ProgramInstruction::encode`]
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(Error::TruncatedRecord {
                needed: DISCRIMINATOR_LEN,
                len: data.len(),
            });
        }
        let (tag, args) = data.split_at(DISCRIMINATOR_LEN);
        let name = INSTRUCTION_NAMES
            .iter()
            .find(|name| instruction_discriminator(name) == tag)
            .ok_or_else(|| Error::SchemaMismatch {
                expected: "instruction",
                found: tag.to_vec(),
            })?;

        let ix = match *name {
            "initialize_poll" => {
                let (poll_id, description, poll_start, poll_end) = decode_args(args)?;
                ProgramInstruction::InitializePoll {
                    poll_id,
                    description,
                    poll_start,
                    poll_end,
                }
            }
            "initialize_candidate" => {
                let (candidate_name, poll_id) = decode_args(args)?;
                ProgramInstruction::InitializeCandidate {
                    candidate_name,
                    poll_id,
                }
            }
            "vote" => {
                let (candidate_name, poll_id) = decode_args(args)?;
                ProgramInstruction::Vote {
                    candidate_name,
                    poll_id,
                }
            }
            "create_journal_entry" => {
                let (title, message) = decode_args(args)?;
                ProgramInstruction::CreateJournalEntry { title, message }
            }
            "update_journal_entry" => {
                let (title, message) = decode_args(args)?;
                ProgramInstruction::UpdateJournalEntry { title, message }
            }
            "delete_journal_entry" => ProgramInstruction::DeleteJournalEntry {
                title: decode_args(args)?,
            },
            "initialize" => ProgramInstruction::Initialize,
            "increment" => ProgramInstruction::Increment,
            "decrement" => ProgramInstruction::Decrement,
            "set" => ProgramInstruction::Set {
                value: decode_args(args)?,
            },
            "close" => ProgramInstruction::Close,
            _ => {
                return Err(Error::SchemaMismatch {
                    expected: "instruction",
                    found: tag.to_vec(),
                })
            }
        };
        Ok(ix)
    }
}

fn decode_args<T: DeserializeOwned>(args: &[u8]) -> Result<T> {
    Ok(codec().with_limit(args.len() as u64).deserialize(args)?)
}

/// Serialize an operation into an instruction for `program_id`
pub(crate) fn build(
    program_id: &crate::types::Pubkey,
    accounts: Vec<crate::types::AccountMeta>,
    payload: ProgramInstruction,
) -> Result<Instruction> {
    tracing::debug!(
        instruction = payload.name(),
        program = %program_id,
        accounts = accounts.len(),
        "built instruction"
    );
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: payload.encode()?,
    })
}

/// Reject empty strings and strings over `max` bytes
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    crate::schema::check_len(field, value, max)
}
