//! Counter builders
//!
//! The counter lives at a caller-generated keypair address rather than a
//! derived one, so `initialize` needs the counter keypair as a co-signer.

use super::{build, ProgramInstruction};
use crate::types::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use crate::Result;

/// Create the counter at `counter` with value zero
pub fn initialize(program_id: &Pubkey, payer: &Pubkey, counter: &Pubkey) -> Result<Instruction> {
    build(
        program_id,
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*counter, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        ProgramInstruction::Initialize,
    )
}

/// Add one
pub fn increment(program_id: &Pubkey, counter: &Pubkey) -> Result<Instruction> {
    build(program_id, vec![AccountMeta::new(*counter, false)], ProgramInstruction::Increment)
}

/// Subtract one
pub fn decrement(program_id: &Pubkey, counter: &Pubkey) -> Result<Instruction> {
    build(program_id, vec![AccountMeta::new(*counter, false)], ProgramInstruction::Decrement)
}

/// Overwrite the value
pub fn set(program_id: &Pubkey, counter: &Pubkey, value: u8) -> Result<Instruction> {
    build(
        program_id,
        vec![AccountMeta::new(*counter, false)],
        ProgramInstruction::Set { value },
    )
}

/// Close the counter, returning its storage deposit to `payer`
pub fn close(program_id: &Pubkey, payer: &Pubkey, counter: &Pubkey) -> Result<Instruction> {
    build(
        program_id,
        vec![AccountMeta::new(*payer, true), AccountMeta::new(*counter, false)],
        ProgramInstruction::Close,
    )
}
