//! Voting program builders: `initialize_poll`, `initialize_candidate`, `vote`

use super::{build, require_text, ProgramInstruction};
use crate::address::{candidate_address, poll_address};
use crate::schema::{MAX_CANDIDATE_NAME_LEN, MAX_DESCRIPTION_LEN};
use crate::types::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use crate::{Error, Result};

/// Create poll `poll_id`, paid for and signed by `signer`
pub fn initialize_poll(
    program_id: &Pubkey,
    signer: &Pubkey,
    poll_id: u64,
    description: &str,
    poll_start: i64,
    poll_end: i64,
) -> Result<Instruction> {
    require_text("description", description, MAX_DESCRIPTION_LEN)?;
    if poll_start >= poll_end {
        return Err(Error::InvalidArgument(format!(
            "poll_start ({}) must be before poll_end ({})",
            poll_start, poll_end
        )));
    }

    let (poll, _) = poll_address(program_id, poll_id)?;
    build(
        program_id,
        vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(poll, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        ProgramInstruction::InitializePoll {
            poll_id,
            description: description.to_string(),
            poll_start,
            poll_end,
        },
    )
}

/// Register `candidate_name` under poll `poll_id`
pub fn initialize_candidate(
    program_id: &Pubkey,
    signer: &Pubkey,
    poll_id: u64,
    candidate_name: &str,
) -> Result<Instruction> {
    require_text("candidate_name", candidate_name, MAX_CANDIDATE_NAME_LEN)?;

    let (poll, _) = poll_address(program_id, poll_id)?;
    let (candidate, _) = candidate_address(program_id, poll_id, candidate_name)?;
    build(
        program_id,
        vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(poll, false),
            AccountMeta::new(candidate, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        ProgramInstruction::InitializeCandidate {
            candidate_name: candidate_name.to_string(),
            poll_id,
        },
    )
}

/// Cast one vote for `candidate_name` in poll `poll_id`
pub fn vote(
    program_id: &Pubkey,
    signer: &Pubkey,
    poll_id: u64,
    candidate_name: &str,
) -> Result<Instruction> {
    require_text("candidate_name", candidate_name, MAX_CANDIDATE_NAME_LEN)?;

    let (poll, _) = poll_address(program_id, poll_id)?;
    let (candidate, _) = candidate_address(program_id, poll_id, candidate_name)?;
    vote_at(program_id, signer, poll, candidate, poll_id, candidate_name)
}

/// [`vote`] with addresses the caller already derived
pub fn vote_at(
    program_id: &Pubkey,
    signer: &Pubkey,
    poll: Pubkey,
    candidate: Pubkey,
    poll_id: u64,
    candidate_name: &str,
) -> Result<Instruction> {
    require_text("candidate_name", candidate_name, MAX_CANDIDATE_NAME_LEN)?;

    build(
        program_id,
        vec![
            AccountMeta::new_readonly(*signer, true),
            AccountMeta::new_readonly(poll, false),
            AccountMeta::new(candidate, false),
        ],
        ProgramInstruction::Vote {
            candidate_name: candidate_name.to_string(),
            poll_id,
        },
    )
}
