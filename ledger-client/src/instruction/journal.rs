//! Journal builders: create, update and delete an entry owned by `owner`

use super::{build, require_text, ProgramInstruction};
use crate::address::journal_entry_address;
use crate::schema::{check_len, MAX_MESSAGE_LEN, MAX_TITLE_LEN};
use crate::types::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use crate::Result;

fn entry_accounts(entry: Pubkey, owner: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(entry, false),
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
    ]
}

/// Create the entry `(title, owner)`
pub fn create_journal_entry(
    program_id: &Pubkey,
    owner: &Pubkey,
    title: &str,
    message: &str,
) -> Result<Instruction> {
    require_text("title", title, MAX_TITLE_LEN)?;
    check_len("message", message, MAX_MESSAGE_LEN)?;

    let (entry, _) = journal_entry_address(program_id, title, owner)?;
    build(
        program_id,
        entry_accounts(entry, owner),
        ProgramInstruction::CreateJournalEntry {
            title: title.to_string(),
            message: message.to_string(),
        },
    )
}

/// Replace the message of `(title, owner)`; title and owner never change
pub fn update_journal_entry(
    program_id: &Pubkey,
    owner: &Pubkey,
    title: &str,
    message: &str,
) -> Result<Instruction> {
    require_text("title", title, MAX_TITLE_LEN)?;
    check_len("message", message, MAX_MESSAGE_LEN)?;

    let (entry, _) = journal_entry_address(program_id, title, owner)?;
    update_journal_entry_at(program_id, owner, entry, title, message)
}

/// [`update_journal_entry`] against an already derived entry address
pub fn update_journal_entry_at(
    program_id: &Pubkey,
    owner: &Pubkey,
    entry: Pubkey,
    title: &str,
    message: &str,
) -> Result<Instruction> {
    require_text("title", title, MAX_TITLE_LEN)?;
    check_len("message", message, MAX_MESSAGE_LEN)?;

    build(
        program_id,
        entry_accounts(entry, owner),
        ProgramInstruction::UpdateJournalEntry {
            title: title.to_string(),
            message: message.to_string(),
        },
    )
}

/// Delete `(title, owner)` and reclaim its storage
pub fn delete_journal_entry(program_id: &Pubkey, owner: &Pubkey, title: &str) -> Result<Instruction> {
    require_text("title", title, MAX_TITLE_LEN)?;

    let (entry, _) = journal_entry_address(program_id, title, owner)?;
    delete_journal_entry_at(program_id, owner, entry, title)
}

/// [`delete_journal_entry`] against an already derived entry address
pub fn delete_journal_entry_at(
    program_id: &Pubkey,
    owner: &Pubkey,
    entry: Pubkey,
    title: &str,
) -> Result<Instruction> {
    require_text("title", title, MAX_TITLE_LEN)?;

    build(
        program_id,
        entry_accounts(entry, owner),
        ProgramInstruction::DeleteJournalEntry {
            title: title.to_string(),
        },
    )
}
